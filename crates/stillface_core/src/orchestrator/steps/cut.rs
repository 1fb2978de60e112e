//! Cut step - slices each synced camera recording into the four phases.
//!
//! For every camera whose `<camera>.mp4` exists in the synced directory,
//! one ffmpeg run per phase writes `<out_dir>/<camera>_<phase>.mp4`.
//! A failed cut is logged and recorded; the remaining clips are still cut.
//! A cancellation request stops the loop before the next ffmpeg run.

use std::fs;

use crate::ffmpeg::cut_command;
use crate::models::{clip_file_name, Camera, CutVideos, Phase, PhaseTimestamps};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, CutOutput, JobState, StepOutcome};

/// Cut step for slicing synced recordings by phase.
///
/// Stores the produced clip paths in `JobState.cut` for the stack step.
pub struct CutStep;

impl CutStep {
    pub fn new() -> Self {
        Self
    }

    fn timestamps<'a>(&self, ctx: &'a Context) -> StepResult<&'a PhaseTimestamps> {
        ctx.job
            .timestamps
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No phase timestamps given"))
    }

    /// Cameras of the job whose synced recording exists.
    fn available_cameras(&self, ctx: &Context) -> Vec<Camera> {
        ctx.job
            .cameras
            .iter()
            .copied()
            .filter(|c| ctx.job.input_video(*c).is_file())
            .collect()
    }
}

impl Default for CutStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CutStep {
    fn name(&self) -> &str {
        "Cut"
    }

    fn description(&self) -> &str {
        "Cut synced recordings into phase clips"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        self.timestamps(ctx)?;

        if !ctx.job.synced_dir.is_dir() {
            return Err(StepError::invalid_input(format!(
                "Synced directory does not exist: {}",
                ctx.job.synced_dir.display()
            )));
        }

        if self.available_cameras(ctx).is_empty() {
            return Err(StepError::invalid_input(format!(
                "No camera recordings found in {} (expected one of: {})",
                ctx.job.synced_dir.display(),
                ctx.job
                    .cameras
                    .iter()
                    .map(|c| c.synced_file_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let timestamps = self.timestamps(ctx)?;

        fs::create_dir_all(&ctx.job.out_dir)
            .map_err(|e| StepError::io_error("creating output directory", e))?;

        for (phase, range) in timestamps.iter() {
            ctx.logger.info(&format!("  {:<9} {} ({}s)", phase, range, range.duration_secs()));
        }
        for warning in timestamps.ordering_warnings() {
            ctx.logger.warn(&warning);
        }

        let reencode = ctx.settings.cutting.reencode;
        let total = ctx.job.cameras.len() * Phase::ALL.len();
        let mut done = 0usize;
        let mut output = CutOutput {
            videos: CutVideos::new(),
            ..Default::default()
        };

        for &camera in &ctx.job.cameras {
            let input = ctx.job.input_video(camera);
            if !input.is_file() {
                ctx.logger.warn(&format!(
                    "Video for camera {} not found: {}",
                    camera,
                    input.display()
                ));
                output.missing_cameras.push(camera);
                done += Phase::ALL.len();
                continue;
            }

            ctx.logger.section(&format!("Camera {}", camera));

            for phase in Phase::ALL {
                let range = timestamps.get(phase);
                let clip = ctx.job.clip_path(camera, phase);
                let cmd = cut_command(&input, &clip, &range, reencode);

                ctx.check_cancelled()?;
                match ctx.runner.run(&cmd, &ctx.logger) {
                    Ok(()) => {
                        ctx.logger.info(&format!("    -> {}", clip_file_name(camera, phase)));
                        output.videos.insert(camera, phase, clip);
                    }
                    // Ctrl-C also kills the running ffmpeg
                    Err(_) if ctx.is_cancelled() => return Err(StepError::Cancelled),
                    Err(e) => {
                        ctx.logger.error(&format!(
                            "Failed to cut {} {}: {}",
                            camera, phase, e
                        ));
                        output.failed.push(format!("{}_{}", camera, phase));
                    }
                }
                ctx.logger.clear_tail();

                done += 1;
                let percent = (done * 100 / total.max(1)) as u32;
                ctx.logger.progress(percent);
                ctx.report_progress(self.name(), percent, &format!("{} {}", camera, phase));
            }
        }

        ctx.logger.info(&format!(
            "Cut {} clip(s), {} failed, {} camera(s) missing",
            output.videos.len(),
            output.failed.len(),
            output.missing_cameras.len()
        ));

        state.cut = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let videos = state
            .cut_videos()
            .ok_or_else(|| StepError::invalid_output("Cut results not recorded"))?;

        if videos.is_empty() {
            return Err(StepError::invalid_output("No clip was produced"));
        }

        for (camera, phase, path) in videos.iter() {
            if !ctx.output_present(path) {
                return Err(StepError::invalid_output(format!(
                    "Clip for {} {} missing after cut: {}",
                    camera,
                    phase,
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::FfmpegRunner;
    use crate::orchestrator::types::test_context_with;

    fn timestamps() -> PhaseTimestamps {
        PhaseTimestamps::parse("00:10-03:10", "03:20-06:20", "06:30-08:30", "08:40-11:40").unwrap()
    }

    fn touch_synced(ctx: &Context, cameras: &[Camera]) {
        fs::create_dir_all(&ctx.job.synced_dir).unwrap();
        for camera in cameras {
            fs::write(ctx.job.input_video(*camera), b"").unwrap();
        }
    }

    #[test]
    fn dry_run_records_every_phase_of_present_cameras() {
        let (ctx, _dir) = test_context_with(|job| job.timestamps = Some(timestamps()));
        touch_synced(&ctx, &[Camera::Mother, Camera::Baby]);

        let step = CutStep::new();
        step.validate_input(&ctx).unwrap();

        let mut state = JobState::new("686527");
        assert_eq!(step.execute(&ctx, &mut state).unwrap(), StepOutcome::Success);
        step.validate_output(&ctx, &state).unwrap();

        let cut = state.cut.as_ref().unwrap();
        assert_eq!(cut.videos.len(), 8);
        assert_eq!(
            cut.videos.get(Camera::Baby, Phase::Stillface),
            Some(ctx.job.out_dir.join("baby_stillface.mp4").as_path())
        );
        assert!(!cut.videos.has_camera(Camera::Window));
        assert_eq!(cut.missing_cameras, vec![Camera::Window, Camera::Door]);
        assert!(cut.failed.is_empty());
        assert!(ctx.job.out_dir.is_dir());
    }

    #[test]
    fn requires_timestamps() {
        let (ctx, _dir) = test_context_with(|_| {});
        touch_synced(&ctx, &[Camera::Baby]);

        assert!(matches!(
            CutStep::new().validate_input(&ctx),
            Err(StepError::InvalidInput(_))
        ));
    }

    #[test]
    fn fails_validation_without_any_recording() {
        let (ctx, _dir) = test_context_with(|job| job.timestamps = Some(timestamps()));
        fs::create_dir_all(&ctx.job.synced_dir).unwrap();

        let err = CutStep::new().validate_input(&ctx).unwrap_err();
        assert!(err.to_string().contains("No camera recordings"));
    }

    #[test]
    fn respects_camera_selection() {
        let (ctx, _dir) = test_context_with(|job| {
            job.timestamps = Some(timestamps());
            job.cameras = vec![Camera::Door];
        });
        touch_synced(&ctx, &[Camera::Mother, Camera::Door]);

        let mut state = JobState::new("686527");
        CutStep::new().execute(&ctx, &mut state).unwrap();

        let cut = state.cut.unwrap();
        assert_eq!(cut.videos.len(), 4);
        assert!(cut.videos.has_camera(Camera::Door));
        assert!(!cut.videos.has_camera(Camera::Mother));
    }

    fn logged_commands(ctx: &Context) -> usize {
        ctx.logger.flush();
        fs::read_to_string(ctx.logger.log_path())
            .unwrap()
            .lines()
            .filter(|l| l.contains("$ ffmpeg"))
            .count()
    }

    #[cfg(unix)]
    #[test]
    fn failed_cuts_are_recorded_and_cutting_continues() {
        let (mut ctx, _dir) = test_context_with(|job| job.timestamps = Some(timestamps()));
        ctx.runner = FfmpegRunner::new("false", "false");
        touch_synced(&ctx, &[Camera::Baby]);

        let step = CutStep::new();
        let mut state = JobState::new("686527");
        assert_eq!(step.execute(&ctx, &mut state).unwrap(), StepOutcome::Success);

        let cut = state.cut.as_ref().unwrap();
        assert_eq!(
            cut.failed,
            vec!["baby_baseline", "baby_play", "baby_stillface", "baby_reunion"]
        );
        assert!(cut.videos.is_empty());
        assert!(matches!(
            step.validate_output(&ctx, &state),
            Err(StepError::InvalidOutput(_))
        ));

        ctx.logger.flush();
        let log = fs::read_to_string(ctx.logger.log_path()).unwrap();
        assert!(log.contains("Failed to cut baby reunion"));
    }

    #[test]
    fn cancellation_stops_before_next_clip() {
        let (ctx, _dir) = test_context_with(|job| job.timestamps = Some(timestamps()));
        touch_synced(&ctx, &[Camera::Mother, Camera::Baby]);

        // cancel as soon as the first clip reports progress
        let handle = ctx.cancel_handle();
        let ctx = ctx.with_progress_callback(Box::new(move |_, _, _| handle.cancel()));

        let mut state = JobState::new("686527");
        let err = CutStep::new().execute(&ctx, &mut state).unwrap_err();

        assert!(err.is_cancelled());
        assert!(state.cut.is_none());
        assert_eq!(logged_commands(&ctx), 1);
    }
}
