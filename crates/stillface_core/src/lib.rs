//! Still-Face Core - backend logic for the phase cutter
//!
//! This crate contains all business logic with zero CLI dependencies:
//! timestamp parsing, session layout, ffmpeg command construction and
//! the step pipeline that cuts and stacks the phase clips.

pub mod config;
pub mod ffmpeg;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod timestamps;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
