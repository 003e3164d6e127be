#![deny(unsafe_code)]

use aperture_voxygen::{
    cli::Args,
    logging,
    render::RecordingBackend,
    session::{Event, SessionState},
    settings::{self, Settings},
    Error,
};
use clap::Parser;
use common::level::LevelData;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = Args::parse();

    let config_dir = args.config_dir.clone().unwrap_or_else(settings::config_dir);
    let settings = Settings::load(&config_dir);
    // Set up logging, the guards flush the logs when dropped
    let _guards = logging::init(&settings, &config_dir);
    settings.display_warnings();
    info!(?config_dir, "Using config dir");

    match run(&args, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        },
    }
}

fn run(args: &Args, settings: &Settings) -> Result<(), Error> {
    let level = LevelData::load(&args.level)?;
    let mut session = SessionState::new(&level, settings)?;
    let mut backend = RecordingBackend::counting_only();

    if args.walk {
        session.handle_event(Event::Move {
            forward: 1.0,
            lateral: 0.0,
        });
    }

    let mut steps = 0;
    for _ in 0..args.frames {
        if args.turn != 0.0 {
            session.handle_event(Event::Look {
                dx: args.turn,
                dy: 0.0,
            });
        }
        steps += session.tick(args.frame_time, &mut backend)?.steps;
    }

    let counters = backend.counters();
    info!(
        frames = counters.frames,
        steps,
        recursive_passes = counters.recursive_passes(),
        deepest_level = ?counters.deepest_level(),
        balanced = backend.stencil_balanced(),
        time = session.state().get_time(),
        "Run finished"
    );
    if let Some((pos, _)) = session.state().player_view() {
        info!(?pos, "Player eye");
    }
    Ok(())
}
