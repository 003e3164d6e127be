use std::{fs, path::Path};

use crate::settings::Settings;

use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, prelude::*, registry, EnvFilter};

const RUST_LOG_ENV: &str = "RUST_LOG";
const LOG_FILENAME: &str = "aperture.log";

/// Initialise tracing and logging for the settings. Log files go to the
/// `logs` folder of `config_dir` unless the settings say otherwise.
///
/// This function will attempt to set up both a file and a terminal logger,
/// falling back to just a terminal logger if the file is unable to be created.
///
/// The logging level is by default set to `INFO`, to change this for any
/// particular crate or module you must use the `RUST_LOG` environment
/// variable, e.g. `RUST_LOG="aperture_common::portal=debug"` to follow
/// travellers through portals. Directives are separated by `,`.
pub fn init(settings: &Settings, config_dir: &Path) -> Vec<impl Drop> {
    // To hold the guards that we create, they will cause the logs to be
    // flushed when they're dropped.
    let mut guards = vec![];

    let mut filter = EnvFilter::default().add_directive(LevelFilter::INFO.into());
    if let Some(Ok(env)) = std::env::var_os(RUST_LOG_ENV).map(|s| s.into_string()) {
        for s in env.split(',').filter(|s| !s.is_empty()) {
            match s.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(err) => println!("WARN ignoring log directive: `{}`: {}", s, err),
            };
        }
    }

    // Create the terminal writer layer.
    let (non_blocking, stdio_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdio_guard);

    let logs_path = &settings.log.logs_path(config_dir);
    let log_folders_created = if settings.log.log_to_file {
        fs::create_dir_all(logs_path).map(Some)
    } else {
        Ok(None)
    };

    match log_folders_created {
        // If the parent folders were created then attach both a terminal and a
        // file writer to the registry and init it.
        Ok(Some(())) => {
            let file_appender = tracing_appender::rolling::daily(logs_path, LOG_FILENAME);
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);
            registry()
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking_file),
                )
                .with(filter)
                .init();
            info!(?logs_path, "Setup terminal and file logging.");
        },
        Ok(None) => {
            registry()
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
                .with(filter)
                .init();
            info!("Setup terminal logging.");
        },
        // Otherwise just add a terminal writer and init it.
        Err(e) => {
            registry()
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
                .with(filter)
                .init();
            error!(
                ?e,
                "Failed to create log file!. Falling back to terminal logging only.",
            );
        },
    };

    guards
}
