//! Stack step - builds the side-by-side composites used for coding.
//!
//! Per phase it writes `mother-baby_<phase>.mp4` (mother above baby, baby
//! audio) and `session_<phase>.mp4` (2x2 grid of all cameras) into the
//! visualize directory. When the clips were cut in the same run every
//! composite is rebuilt; otherwise existing composites are kept unless
//! `stacking.overwrite` is set. A cancellation request stops the step
//! before the next ffmpeg run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ffmpeg::{grid_command, vstack_command, FfmpegCommand, GridOptions};
use crate::models::{grid_file_name, Camera, CutVideos, Phase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StackOutput, StepOutcome};
use crate::session::find_cut_videos;

/// Input index of the baby clip in the mother/baby stack.
const BABY_AUDIO_INPUT: usize = 1;

/// File name of the mother/baby composite of a phase.
pub fn mother_baby_file_name(phase: Phase) -> String {
    format!("mother-baby_{}.mp4", phase)
}

/// Stack step for building composite videos from phase clips.
///
/// Uses clips from `JobState.cut` when the cut step ran in the same
/// pipeline, otherwise scans the job's output directory.
pub struct StackStep;

impl StackStep {
    pub fn new() -> Self {
        Self
    }

    fn clips(&self, ctx: &Context, state: &JobState) -> CutVideos {
        match state.cut_videos() {
            Some(videos) => videos.clone(),
            None => {
                ctx.logger.info(&format!(
                    "Looking for phase clips in {}",
                    ctx.job.out_dir.display()
                ));
                find_cut_videos(&ctx.job.out_dir)
            }
        }
    }

    /// Whether an existing composite should be kept as is.
    fn keep_existing(&self, ctx: &Context, output: &Path, overwrite: bool) -> bool {
        if overwrite || !output.is_file() {
            return false;
        }
        ctx.logger.info(&format!(
            "  Keeping existing {}",
            output.file_name().unwrap_or_default().to_string_lossy()
        ));
        true
    }

    fn run_composite(
        &self,
        ctx: &Context,
        cmd: &FfmpegCommand,
        done: &mut BTreeMap<Phase, PathBuf>,
        skipped: &mut Vec<String>,
        phase: Phase,
    ) -> StepResult<()> {
        let name = cmd
            .output()
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        ctx.check_cancelled()?;
        match ctx.runner.run(cmd, &ctx.logger) {
            Ok(()) => {
                ctx.logger.info(&format!("    -> {}", name));
                done.insert(phase, cmd.output().to_path_buf());
            }
            Err(_) if ctx.is_cancelled() => return Err(StepError::Cancelled),
            Err(e) => {
                ctx.logger.error(&format!("Failed to build {}: {}", name, e));
                skipped.push(format!("{}: {}", name, e));
            }
        }
        ctx.logger.clear_tail();
        Ok(())
    }
}

impl Default for StackStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for StackStep {
    fn name(&self) -> &str {
        "Stack"
    }

    fn description(&self) -> &str {
        "Build mother/baby and 2x2 composite videos"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        if !ctx.settings.stacking.enabled {
            return Ok(StepOutcome::Skipped("stacking disabled in config".to_string()));
        }

        let clips = self.clips(ctx, state);
        if clips.is_empty() {
            return Ok(StepOutcome::Skipped("no phase clips to stack".to_string()));
        }

        let visualize_dir = &ctx.job.visualize_dir;
        fs::create_dir_all(visualize_dir)
            .map_err(|e| StepError::io_error("creating visualize directory", e))?;

        let options = GridOptions::from(&ctx.settings.stacking);
        // composites of earlier cuts are stale once the clips are re-cut
        let overwrite = ctx.settings.stacking.overwrite || state.has_cut();
        let mut output = StackOutput::default();

        for (i, phase) in Phase::ALL.into_iter().enumerate() {
            ctx.logger.section(&format!("Phase {}", phase));

            let present: BTreeMap<Camera, PathBuf> = clips
                .for_phase(phase)
                .into_iter()
                .filter(|(_, path)| ctx.output_present(path))
                .collect();

            let mother_baby = visualize_dir.join(mother_baby_file_name(phase));
            match (present.get(&Camera::Mother), present.get(&Camera::Baby)) {
                (Some(mother), Some(baby)) => {
                    if self.keep_existing(ctx, &mother_baby, overwrite) {
                        output.mother_baby.insert(phase, mother_baby);
                    } else {
                        let cmd = vstack_command(mother, baby, &mother_baby, BABY_AUDIO_INPUT);
                        self.run_composite(
                            ctx,
                            &cmd,
                            &mut output.mother_baby,
                            &mut output.skipped,
                            phase,
                        )?;
                    }
                }
                _ => {
                    ctx.logger.info(&format!(
                        "  Skipping {}: mother or baby clip missing",
                        mother_baby_file_name(phase)
                    ));
                    output
                        .skipped
                        .push(format!("{}: mother or baby clip missing", mother_baby_file_name(phase)));
                }
            }

            let grid = visualize_dir.join(grid_file_name(phase));
            if self.keep_existing(ctx, &grid, overwrite) {
                output.grids.insert(phase, grid);
            } else {
                match grid_command(&present, &grid, &options) {
                    Some(grid_cmd) => {
                        let missing: Vec<_> = Camera::GRID_ORDER
                            .iter()
                            .filter(|c| !present.contains_key(c))
                            .map(|c| c.as_str())
                            .collect();
                        if !missing.is_empty() {
                            ctx.logger.info(&format!(
                                "  Black placeholder for: {}",
                                missing.join(", ")
                            ));
                        }
                        match grid_cmd.audio_from {
                            Some(camera) => ctx.logger.debug(&format!("  Grid audio from {}", camera)),
                            None => ctx.logger.warn("Grid has no audio source"),
                        }
                        self.run_composite(
                            ctx,
                            &grid_cmd.command,
                            &mut output.grids,
                            &mut output.skipped,
                            phase,
                        )?;
                    }
                    None => {
                        ctx.logger.info(&format!(
                            "  Skipping {}: no clips for this phase",
                            grid_file_name(phase)
                        ));
                        output
                            .skipped
                            .push(format!("{}: no clips for this phase", grid_file_name(phase)));
                    }
                }
            }

            let percent = ((i + 1) * 100 / Phase::ALL.len()) as u32;
            ctx.logger.progress(percent);
            ctx.report_progress(self.name(), percent, phase.as_str());
        }

        ctx.logger.info(&format!(
            "{} mother/baby composite(s), {} grid(s), {} skipped",
            output.mother_baby.len(),
            output.grids.len(),
            output.skipped.len()
        ));

        state.stack = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .stack
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Stack results not recorded"))?;

        for path in output.mother_baby.values().chain(output.grids.values()) {
            if !ctx.output_present(path) {
                return Err(StepError::invalid_output(format!(
                    "Composite missing after stacking: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}
