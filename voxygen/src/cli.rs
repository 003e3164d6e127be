use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[clap(version, about = "Walk through portals, see through portals")]
pub struct Args {
    /// Level to load, a RON level description.
    #[clap(short, long, default_value = "assets/levels/default.ron")]
    pub level: PathBuf,

    /// Number of frames to run before exiting.
    #[clap(short, long, default_value_t = 300)]
    pub frames: u32,

    /// Simulated wall clock time per frame, in seconds.
    #[clap(long, default_value_t = 1.0 / 60.0)]
    pub frame_time: f32,

    /// Keep walking forward the whole run.
    #[clap(long)]
    pub walk: bool,

    /// Turn rate while running, in raw mouse units per frame.
    #[clap(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub turn: f32,

    /// Directory holding `settings.ron` and the logs.
    #[clap(long, env = "APERTURE_CONFIG")]
    pub config_dir: Option<PathBuf>,
}
