//! Data models for the phase cutter.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for protocol phases and cameras
//! - Job structures (subject IDs, phase timestamps, cut results)

mod enums;
mod jobs;

pub use enums::{Camera, ModelError, Phase};
pub use jobs::{clip_file_name, grid_file_name, CutVideos, JobSpec, PhaseTimestamps, SubjectId};
