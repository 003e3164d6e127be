use serde::{Deserialize, Serialize};

/// `GameplaySettings` contains sensitivity and gameplay options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    /// Radians of look per unit of raw mouse motion, in thousandths.
    pub pan_sensitivity: u32,
    pub mouse_y_inversion: bool,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            pan_sensitivity: 2,
            mouse_y_inversion: false,
        }
    }
}

impl GameplaySettings {
    /// Look deltas for raw mouse motion.
    pub fn look_deltas(&self, motion_x: f32, motion_y: f32) -> (f32, f32) {
        let scale = self.pan_sensitivity as f32 / 1000.0;
        let pitch = if self.mouse_y_inversion {
            motion_y
        } else {
            -motion_y
        };
        (-motion_x * scale, pitch * scale)
    }
}
