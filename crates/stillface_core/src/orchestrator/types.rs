//! Core types for the orchestrator pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{StepError, StepResult};
use super::pipeline::CancelHandle;
use crate::config::Settings;
use crate::ffmpeg::FfmpegRunner;
use crate::logging::JobLogger;
use crate::models::{Camera, CutVideos, JobSpec, Phase};

/// File name of the job state manifest written next to the clips.
pub const MANIFEST_FILE_NAME: &str = "cut_manifest.json";

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Contains job configuration and shared resources that steps can read
/// but not modify. Mutable state goes in `JobState`.
pub struct Context {
    /// Job specification (directories, timestamps, cameras).
    pub job: JobSpec,
    /// Application settings.
    pub settings: Settings,
    /// Job name/identifier.
    pub job_name: String,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    /// ffmpeg process runner.
    pub runner: FfmpegRunner,
    /// Cancellation flag, checked by the pipeline and inside step loops.
    cancel: CancelHandle,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context for a job.
    pub fn new(
        job: JobSpec,
        settings: Settings,
        job_name: impl Into<String>,
        logger: Arc<JobLogger>,
        runner: FfmpegRunner,
    ) -> Self {
        Self {
            job,
            settings,
            job_name: job_name.into(),
            logger,
            runner,
            cancel: CancelHandle::new(),
            progress_callback: None,
        }
    }

    /// Share an existing cancellation flag (e.g. one wired to Ctrl-C).
    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Handle that cancels this job at its next check.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`StepError::Cancelled`] once cancellation was requested.
    ///
    /// Steps call this before every ffmpeg run.
    pub fn check_cancelled(&self) -> StepResult<()> {
        if self.is_cancelled() {
            self.logger.warn("Cancellation requested, stopping");
            return Err(StepError::Cancelled);
        }
        Ok(())
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Whether a file produced (or expected) by a step should count as present.
    ///
    /// In dry-run mode nothing is written, so planned outputs are trusted.
    pub fn output_present(&self, path: &Path) -> bool {
        self.runner.is_dry_run() || path.is_file()
    }
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Each step's output is stored in its own section; steps add new data
/// but do not overwrite another step's section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    /// Unique job identifier.
    pub job_id: String,
    /// When the job started.
    pub started_at: Option<String>,
    /// Cut results (from Cut step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut: Option<CutOutput>,
    /// Composite results (from Stack step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackOutput>,
    /// Thumbnail results (from Thumbnail step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailOutput>,
}

impl JobState {
    /// Create a new job state with the given ID.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Check if cutting has been completed.
    pub fn has_cut(&self) -> bool {
        self.cut.is_some()
    }

    /// Clips produced by the Cut step (if it ran).
    pub fn cut_videos(&self) -> Option<&CutVideos> {
        self.cut.as_ref().map(|c| &c.videos)
    }

    /// Write the state as pretty JSON into `dir`, returning the file path.
    pub fn save_manifest(&self, dir: &Path) -> StepResult<PathBuf> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StepError::other(format!("Failed to serialize job state: {}", e)))?;
        fs::create_dir_all(dir).map_err(|e| StepError::io_error("creating manifest directory", e))?;
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, json).map_err(|e| StepError::io_error("writing manifest", e))?;
        Ok(path)
    }
}

/// Output from the Cut step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutOutput {
    /// Clips that were produced.
    pub videos: CutVideos,
    /// Cameras whose synced recording was missing.
    #[serde(default)]
    pub missing_cameras: Vec<Camera>,
    /// Clips whose ffmpeg run failed, as `<camera>_<phase>`.
    #[serde(default)]
    pub failed: Vec<String>,
}

/// Output from the Stack step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackOutput {
    /// Mother-over-baby composites per phase.
    pub mother_baby: BTreeMap<Phase, PathBuf>,
    /// 2x2 grids per phase.
    pub grids: BTreeMap<Phase, PathBuf>,
    /// Composites that were not produced, with the reason.
    #[serde(default)]
    pub skipped: Vec<String>,
}

/// Output from the Thumbnail step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailOutput {
    /// Video the frame was taken from.
    pub source: PathBuf,
    /// Offset of the frame in seconds.
    pub at_secs: f64,
    /// Image files written.
    pub written: Vec<PathBuf>,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}

/// Context over a temp directory with a dry-run runner, for step tests.
#[cfg(test)]
pub(crate) fn test_context() -> (Context, tempfile::TempDir) {
    test_context_with(|_| {})
}

#[cfg(test)]
pub(crate) fn test_context_with(
    configure: impl FnOnce(&mut JobSpec),
) -> (Context, tempfile::TempDir) {
    use crate::logging::LogConfig;

    let dir = tempfile::tempdir().unwrap();
    let mut job = JobSpec::new(dir.path().join("synced"), dir.path().join("processed"));
    configure(&mut job);

    let logger = JobLogger::new("test", dir.path().join("logs"), LogConfig::default(), None)
        .unwrap();
    let ctx = Context::new(
        job,
        Settings::default(),
        "test",
        Arc::new(logger),
        FfmpegRunner::default().with_dry_run(true),
    );
    (ctx, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn job_state_tracks_completion() {
        let mut state = JobState::new("686527");
        assert!(!state.has_cut());

        let mut videos = CutVideos::new();
        videos.insert(Camera::Baby, Phase::Play, "/out/baby_play.mp4");
        state.cut = Some(CutOutput {
            videos,
            ..Default::default()
        });

        assert!(state.has_cut());
        assert_eq!(state.cut_videos().map(CutVideos::len), Some(1));
    }

    #[test]
    fn job_state_serializes() {
        let state = JobState::new("686527");
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"job_id\":\"686527\""));
        assert!(!json.contains("\"cut\""));
    }

    #[test]
    fn manifest_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = JobState::new("686527");
        state.cut = Some(CutOutput {
            missing_cameras: vec![Camera::Door],
            ..Default::default()
        });

        let path = state.save_manifest(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), MANIFEST_FILE_NAME);

        let loaded: JobState = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.cut.unwrap().missing_cameras, vec![Camera::Door]);
    }

    #[test]
    fn progress_callback_receives_updates() {
        let last = Arc::new(AtomicU32::new(0));
        let last_clone = last.clone();
        let (ctx, _dir) = test_context();
        let ctx = ctx.with_progress_callback(Box::new(move |_step, pct, _msg| {
            last_clone.store(pct, Ordering::SeqCst);
        }));

        ctx.report_progress("Cut", 40, "Cutting");
        assert_eq!(last.load(Ordering::SeqCst), 40);
    }

    #[test]
    fn shared_cancel_handle_reaches_context() {
        let handle = CancelHandle::new();
        let (ctx, _dir) = test_context();
        let ctx = ctx.with_cancel_handle(handle.clone());

        assert!(ctx.check_cancelled().is_ok());
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check_cancelled(), Err(StepError::Cancelled)));
    }
}
