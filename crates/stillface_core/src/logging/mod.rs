//! Logging infrastructure for the phase cutter.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use stillface_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("686527", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Cut");
//! logger.command("ffmpeg -ss 00:10 -i baby.mp4 ...");
//! logger.progress(50);
//! logger.success("Cut completed");
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::{JobLogger, JobLoggerBuilder};
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Prefix of the application-wide rolling log files.
const APP_LOG_PREFIX: &str = "stillface";

/// Target of the events a [`JobLogger`] mirrors into `tracing`.
///
/// The job logger already prints these lines through its callback, so the
/// console layer drops them and only the log file receives them.
pub const JOB_LOG_TARGET: &str = "stillface::job";

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(console_layer(std::io::stderr))
        .try_init();
}

/// Initialize tracing with stderr output plus a daily rolling file in `logs_dir`.
///
/// The returned guard must be kept alive for buffered lines to reach the
/// file. Falls back to stderr-only logging (and returns `None`) if the log
/// directory cannot be used.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    let appender = std::fs::create_dir_all(logs_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(APP_LOG_PREFIX)
                .filename_suffix("log")
                .build(logs_dir)
                .map_err(|e| e.to_string())
        });

    let appender = match appender {
        Ok(appender) => appender,
        Err(e) => {
            init_tracing(default_level);
            tracing::warn!(
                "File logging disabled ({}): {}",
                logs_dir.display(),
                e
            );
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(console_layer(std::io::stderr))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    Some(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

/// Compact console output without the job logger's mirrored events.
fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .compact()
        .with_filter(filter_fn(|meta| meta.target() != JOB_LOG_TARGET))
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)))
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
