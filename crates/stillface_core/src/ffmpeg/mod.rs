//! ffmpeg integration.
//!
//! Commands are built as plain argument vectors by [`command`] and
//! executed by [`FfmpegRunner`], which routes their output through the
//! job logger.

mod command;
mod runner;

pub use command::{
    cut_command, duration_probe_args, grid_command, thumbnail_command, vstack_command,
    FfmpegCommand, GridCommand, GridOptions,
};
pub use runner::FfmpegRunner;
