//! Core enums used throughout the crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when parsing model values from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown phase '{0}' (expected baseline, play, stillface or reunion)")]
    UnknownPhase(String),

    #[error("Unknown camera '{0}' (expected mother, baby, window or door)")]
    UnknownCamera(String),

    #[error("Invalid subject ID '{id}': {reason}")]
    InvalidSubjectId { id: String, reason: String },
}

/// Phase of the Still-Face recording protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Free interaction before play.
    Baseline,
    /// Normal face-to-face play.
    Play,
    /// Caregiver holds a neutral, unresponsive face.
    Stillface,
    /// Caregiver resumes normal interaction.
    Reunion,
}

impl Phase {
    /// All phases in protocol order.
    pub const ALL: [Phase; 4] = [Phase::Baseline, Phase::Play, Phase::Stillface, Phase::Reunion];

    /// Lower-case name used in file names and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Baseline => "baseline",
            Phase::Play => "play",
            Phase::Stillface => "stillface",
            Phase::Reunion => "reunion",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownPhase(s.to_string()))
    }
}

/// Camera recording one view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Camera {
    Mother,
    Baby,
    Window,
    Door,
}

impl Camera {
    /// All cameras in processing order.
    pub const ALL: [Camera; 4] = [Camera::Mother, Camera::Baby, Camera::Window, Camera::Door];

    /// Grid placement: top-left, top-right, bottom-left, bottom-right.
    pub const GRID_ORDER: [Camera; 4] =
        [Camera::Mother, Camera::Window, Camera::Baby, Camera::Door];

    /// Fallback order when choosing which camera's audio to keep.
    pub const AUDIO_PRIORITY: [Camera; 4] =
        [Camera::Baby, Camera::Mother, Camera::Window, Camera::Door];

    /// Lower-case name used in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Camera::Mother => "mother",
            Camera::Baby => "baby",
            Camera::Window => "window",
            Camera::Door => "door",
        }
    }

    /// File name of this camera's synced recording.
    pub fn synced_file_name(&self) -> String {
        format!("{}.mp4", self.as_str())
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Camera {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Camera::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownCamera(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_in_protocol_order() {
        let names: Vec<_> = Phase::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["baseline", "play", "stillface", "reunion"]);
    }

    #[test]
    fn camera_parses_case_insensitively() {
        assert_eq!("Baby".parse::<Camera>().unwrap(), Camera::Baby);
        assert_eq!(" door ".parse::<Camera>().unwrap(), Camera::Door);
        assert!(matches!(
            "ceiling".parse::<Camera>(),
            Err(ModelError::UnknownCamera(_))
        ));
    }

    #[test]
    fn grid_order_places_window_top_right() {
        assert_eq!(Camera::GRID_ORDER[1], Camera::Window);
        assert_eq!(Camera::GRID_ORDER[2], Camera::Baby);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Phase::Stillface).unwrap();
        assert_eq!(json, "\"stillface\"");
        let cam: Camera = serde_json::from_str("\"mother\"").unwrap();
        assert_eq!(cam, Camera::Mother);
    }
}
