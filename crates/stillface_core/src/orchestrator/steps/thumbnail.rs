//! Thumbnail step - grabs the middle frame of the stillface grid.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ffmpeg::thumbnail_command;
use crate::models::{grid_file_name, Phase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome, ThumbnailOutput};

/// Phase whose grid the thumbnail is taken from.
const THUMBNAIL_PHASE: Phase = Phase::Stillface;

/// Thumbnail step writing one frame to every target path.
///
/// The frame is extracted once into the first target and copied to the rest.
pub struct ThumbnailStep {
    targets: Vec<PathBuf>,
}

impl ThumbnailStep {
    pub fn new(targets: Vec<PathBuf>) -> Self {
        Self { targets }
    }

    fn source(&self, ctx: &Context) -> PathBuf {
        ctx.job.visualize_dir.join(grid_file_name(THUMBNAIL_PHASE))
    }
}

fn create_parent(path: &Path) -> StepResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| StepError::io_error(format!("creating {}", parent.display()), e)),
        _ => Ok(()),
    }
}

impl PipelineStep for ThumbnailStep {
    fn name(&self) -> &str {
        "Thumbnail"
    }

    fn description(&self) -> &str {
        "Extract a thumbnail from the stillface grid"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if self.targets.is_empty() {
            return Err(StepError::invalid_input("No thumbnail target given"));
        }
        let source = self.source(ctx);
        if !ctx.output_present(&source) {
            return Err(StepError::file_not_found(source.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let source = self.source(ctx);
        let duration = ctx.runner.probe_duration(&source, &ctx.logger)?;
        let at_secs = duration / 2.0;
        ctx.logger.info(&format!(
            "{}: {:.2}s, frame at {:.2}s",
            source.display(),
            duration,
            at_secs
        ));

        let (first, copies) = self
            .targets
            .split_first()
            .ok_or_else(|| StepError::invalid_input("No thumbnail target given"))?;

        ctx.check_cancelled()?;
        ctx.runner
            .run(&thumbnail_command(&source, at_secs, first), &ctx.logger)
            .map_err(|e| if ctx.is_cancelled() { StepError::Cancelled } else { e })?;

        for target in copies {
            ctx.logger.info(&format!("Copying thumbnail to {}", target.display()));
            if ctx.runner.is_dry_run() {
                continue;
            }
            create_parent(target)?;
            fs::copy(first, target)
                .map_err(|e| StepError::io_error(format!("copying thumbnail to {}", target.display()), e))?;
        }

        state.thumbnail = Some(ThumbnailOutput {
            source,
            at_secs,
            written: self.targets.clone(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .thumbnail
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Thumbnail not recorded"))?;
        match output.written.iter().find(|p| !ctx.output_present(p)) {
            Some(missing) => Err(StepError::invalid_output(format!(
                "Thumbnail not written: {}",
                missing.display()
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::types::{test_context, test_context_with};

    #[test]
    fn dry_run_records_targets() {
        let (ctx, dir) = test_context();
        let targets = vec![
            dir.path().join("Sessions/686527/thumbnail.png"),
            dir.path().join("Thumbnails/686527.png"),
        ];
        let step = ThumbnailStep::new(targets.clone());

        step.validate_input(&ctx).unwrap();
        let mut state = JobState::new("686527");
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let thumb = state.thumbnail.unwrap();
        assert_eq!(thumb.written, targets);
        assert_eq!(thumb.source, ctx.job.visualize_dir.join("session_stillface.mp4"));
        assert!(!targets[1].exists());
    }

    #[test]
    fn missing_grid_fails_validation() {
        let (mut ctx, dir) = test_context_with(|_| {});
        ctx.runner = ctx.runner.clone().with_dry_run(false);

        let step = ThumbnailStep::new(vec![dir.path().join("thumbnail.png")]);
        assert!(matches!(
            step.validate_input(&ctx),
            Err(StepError::FileNotFound { .. })
        ));
    }

    #[test]
    fn requires_a_target() {
        let (ctx, _dir) = test_context();
        assert!(ThumbnailStep::new(Vec::new()).validate_input(&ctx).is_err());
    }
}
