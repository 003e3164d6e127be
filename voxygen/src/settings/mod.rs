use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub mod gameplay;
pub mod graphics;

pub use gameplay::GameplaySettings;
pub use graphics::GraphicsSettings;

/// `PhysicsSettings` controls the fixed step simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Physics steps per second.
    pub tick_rate: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            tick_rate: common::consts::DEFAULT_TICK_RATE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Whether to write logs to a file as well as the terminal.
    pub log_to_file: bool,
    /// Overrides the `logs` folder inside the config dir in use.
    pub logs_path: Option<PathBuf>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            log_to_file: true,
            logs_path: None,
        }
    }
}

impl Log {
    pub fn logs_path(&self, config_dir: &Path) -> PathBuf {
        self.logs_path
            .clone()
            .unwrap_or_else(|| config_dir.join("logs"))
    }
}

/// `Settings` contains everything that can be configured in the settings.ron
/// file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graphics: GraphicsSettings,
    pub gameplay: GameplaySettings,
    pub physics: PhysicsSettings,
    pub log: Log,
}

impl Settings {
    pub fn load(config_dir: &Path) -> Self {
        let path = Self::get_path(config_dir);

        if let Ok(file) = fs::File::open(&path) {
            match ron::de::from_reader::<_, Self>(file) {
                Ok(s) => return s,
                Err(e) => {
                    warn!(?e, "Failed to parse setting file! Fallback to default.");
                    // Rename the corrupted settings file
                    let new_path = config_dir.join("settings.invalid.ron");
                    if let Err(e) = fs::rename(&path, &new_path) {
                        warn!(?e, ?path, ?new_path, "Failed to rename settings file.");
                    }
                },
            }
        }
        // Either there is no file yet or it could not be parsed
        let default_settings = Self::default();
        default_settings.save_to_file_warn(config_dir);
        default_settings
    }

    pub fn save_to_file_warn(&self, config_dir: &Path) {
        if let Err(e) = self.save_to_file(config_dir) {
            warn!(?e, "Failed to save settings");
        }
    }

    pub fn save_to_file(&self, config_dir: &Path) -> std::io::Result<()> {
        let path = Self::get_path(config_dir);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let ron = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, ron.as_bytes())
    }

    fn get_path(config_dir: &Path) -> PathBuf { config_dir.join("settings.ron") }

    pub fn display_warnings(&self) {
        if self.graphics.max_recursion > 8 {
            warn!(
                max_recursion = self.graphics.max_recursion,
                "Deep portal recursion redraws the scene once per visible portal per level, \
                 expect low frame rates."
            );
        }
    }
}

/// Where settings live unless overridden: the `APERTURE_CONFIG` environment
/// variable, the platform config directory, or the working directory.
pub fn config_dir() -> PathBuf {
    std::env::var_os("APERTURE_CONFIG")
        .map(PathBuf::from)
        .or_else(|| {
            ProjectDirs::from("net", "aperture", "aperture")
                .map(|dirs| dirs.config_dir().to_path_buf())
        })
        .unwrap_or_else(|| PathBuf::from("userdata"))
}
