//! Job-related structures.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::enums::{Camera, ModelError, Phase};
use crate::timestamps::{TimeRange, TimestampError};

/// File name of one camera's clip for one phase (`mother_play.mp4`).
pub fn clip_file_name(camera: Camera, phase: Phase) -> String {
    format!("{}_{}.mp4", camera, phase)
}

/// File name of the 2x2 grid composite for one phase (`session_play.mp4`).
pub fn grid_file_name(phase: Phase) -> String {
    format!("session_{}.mp4", phase)
}

/// Identifier of a recorded subject/session (e.g. `686527`).
///
/// Used as a directory name, so it must be non-empty and free of path
/// separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into();
        let trimmed = id.trim();

        let reason = if trimmed.is_empty() {
            Some("must not be empty")
        } else if trimmed.contains(['/', '\\']) {
            Some("must not contain path separators")
        } else if trimmed == "." || trimmed == ".." {
            Some("must not be a relative directory")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ModelError::InvalidSubjectId {
                id,
                reason: reason.to_string(),
            }),
            None => Ok(Self(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubjectId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

/// Time range of each protocol phase within the synced recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimestamps {
    pub baseline: TimeRange,
    pub play: TimeRange,
    pub stillface: TimeRange,
    pub reunion: TimeRange,
}

impl PhaseTimestamps {
    pub fn new(baseline: TimeRange, play: TimeRange, stillface: TimeRange, reunion: TimeRange) -> Self {
        Self {
            baseline,
            play,
            stillface,
            reunion,
        }
    }

    /// Parse the four `START-END` strings in protocol order.
    pub fn parse(
        baseline: &str,
        play: &str,
        stillface: &str,
        reunion: &str,
    ) -> Result<Self, TimestampError> {
        Ok(Self::new(
            baseline.parse()?,
            play.parse()?,
            stillface.parse()?,
            reunion.parse()?,
        ))
    }

    /// Range for a single phase.
    pub fn get(&self, phase: Phase) -> TimeRange {
        match phase {
            Phase::Baseline => self.baseline,
            Phase::Play => self.play,
            Phase::Stillface => self.stillface,
            Phase::Reunion => self.reunion,
        }
    }

    /// Iterate `(phase, range)` pairs in protocol order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, TimeRange)> + '_ {
        Phase::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    /// Describe phases that overlap or run out of protocol order.
    ///
    /// These are not errors (a phase can legitimately be re-coded), but
    /// they usually point to a typo in one of the ranges.
    pub fn ordering_warnings(&self) -> Vec<String> {
        let ranges: Vec<_> = self.iter().collect();
        ranges
            .windows(2)
            .filter_map(|pair| {
                let (prev_phase, prev) = pair[0];
                let (next_phase, next) = pair[1];
                if next.start() < prev.end() {
                    Some(format!(
                        "{} ({}) starts before {} ({}) ends",
                        next_phase, next, prev_phase, prev
                    ))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Specification of one cutting job.
///
/// Describes where the synced recordings live and where clips and
/// composites are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// Directory containing `<camera>.mp4` synced recordings.
    pub synced_dir: PathBuf,
    /// Directory receiving `<camera>_<phase>.mp4` clips.
    pub out_dir: PathBuf,
    /// Directory receiving the stacked composites.
    pub visualize_dir: PathBuf,
    /// Phase ranges (required by the cut step only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<PhaseTimestamps>,
    /// Cameras to process, in order.
    pub cameras: Vec<Camera>,
}

impl JobSpec {
    /// Create a job writing composites to `<out_dir>/visualize`.
    pub fn new(synced_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        let out_dir = out_dir.into();
        Self {
            synced_dir: synced_dir.into(),
            visualize_dir: out_dir.join("visualize"),
            out_dir,
            timestamps: None,
            cameras: Camera::ALL.to_vec(),
        }
    }

    pub fn with_timestamps(mut self, timestamps: PhaseTimestamps) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn with_visualize_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.visualize_dir = dir.into();
        self
    }

    pub fn with_cameras(mut self, cameras: Vec<Camera>) -> Self {
        self.cameras = cameras;
        self
    }

    /// Path of a camera's synced recording.
    pub fn input_video(&self, camera: Camera) -> PathBuf {
        self.synced_dir.join(camera.synced_file_name())
    }

    /// Path of a camera's clip for one phase.
    pub fn clip_path(&self, camera: Camera, phase: Phase) -> PathBuf {
        self.out_dir.join(clip_file_name(camera, phase))
    }
}

/// Clips produced per camera and phase.
///
/// Only successful cuts are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CutVideos(BTreeMap<Camera, BTreeMap<Phase, PathBuf>>);

impl CutVideos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a produced clip.
    pub fn insert(&mut self, camera: Camera, phase: Phase, path: impl Into<PathBuf>) {
        self.0.entry(camera).or_default().insert(phase, path.into());
    }

    /// Path of a camera's clip for one phase, if it was produced.
    pub fn get(&self, camera: Camera, phase: Phase) -> Option<&Path> {
        self.0
            .get(&camera)
            .and_then(|phases| phases.get(&phase))
            .map(PathBuf::as_path)
    }

    /// Whether any clip was recorded for this camera.
    pub fn has_camera(&self, camera: Camera) -> bool {
        self.0.get(&camera).is_some_and(|phases| !phases.is_empty())
    }

    /// Clips of all cameras for one phase.
    pub fn for_phase(&self, phase: Phase) -> BTreeMap<Camera, PathBuf> {
        self.0
            .iter()
            .filter_map(|(cam, phases)| phases.get(&phase).map(|p| (*cam, p.clone())))
            .collect()
    }

    /// Total number of clips.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(camera, phase, path)` in camera then phase order.
    pub fn iter(&self) -> impl Iterator<Item = (Camera, Phase, &Path)> + '_ {
        self.0.iter().flat_map(|(cam, phases)| {
            phases
                .iter()
                .map(move |(phase, path)| (*cam, *phase, path.as_path()))
        })
    }
}
