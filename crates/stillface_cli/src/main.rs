//! Still-Face phase cutter - command-line entry point.
//!
//! Handles:
//! - Configuration loading (CLI flags override it in memory)
//! - Application-level logging initialization
//! - Ctrl-C cancellation
//! - Subcommand dispatch and exit codes

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;

use stillface_core::config::ConfigManager;
use stillface_core::ffmpeg::FfmpegRunner;
use stillface_core::logging::init_tracing_with_file;
use stillface_core::orchestrator::CancelHandle;

mod args;
mod commands;

use args::{Cli, Commands};
use commands::App;

/// Exit code of a run stopped with Ctrl-C.
const EXIT_CANCELLED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if commands::is_cancelled(&e) => {
            eprintln!("Cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ConfigManager::new(&cli.config);
    if let Err(e) = config.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }

    let level = commands::log_level(config.settings(), cli.verbose);
    let _log_guard = init_tracing_with_file(level, &config.logs_folder());

    tracing::debug!("Config: {}", config.path().display());
    tracing::debug!("Core version: {}", stillface_core::version());

    let settings = config.settings_mut();
    settings.logging.level = level;
    if let Some(ref ffmpeg) = cli.ffmpeg {
        settings.tools.ffmpeg = ffmpeg.to_string_lossy().into_owned();
    }

    let runner = FfmpegRunner::from_settings(&config.settings().tools).with_dry_run(cli.dry_run);
    if cli.dry_run {
        tracing::info!("Dry run: ffmpeg commands are logged, not executed");
    }

    let cancel = CancelHandle::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Cancelling...");
        handle.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    let app = App {
        settings: config.settings().clone(),
        db_dir: config.db_dir(),
        logs_dir: config.logs_folder(),
        runner,
        cancel,
    };

    match cli.command {
        Commands::Cut(args) => commands::cut(&app, args),
        Commands::Session(args) => commands::session(&app, args),
        Commands::Stack(args) => commands::stack(&app, args),
        Commands::Thumbnail(args) => commands::thumbnail(&app, args),
    }
}
