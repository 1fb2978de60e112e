//! Pipeline runner that executes steps in sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PipelineStep;
use super::types::{Context, JobState, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// Steps run in order with validation before and after each one. The
/// cancellation flag lives in the [`Context`]: the pipeline checks it at
/// every step boundary, and steps check it between their ffmpeg runs.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run the pipeline with the given context and state.
    ///
    /// Executes each step in order:
    /// 1. Check for cancellation
    /// 2. Run `validate_input`
    /// 3. Run `execute`
    /// 4. Run `validate_output` (if execute returned Success)
    ///
    /// A step returning [`StepError::Cancelled`] ends the run with
    /// [`PipelineError::Cancelled`], like a cancellation between steps.
    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult {
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
        };

        let total_steps = self.steps.len();

        for (i, step) in self.steps.iter().enumerate() {
            let step_name = step.name();

            if ctx.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                return Err(PipelineError::cancelled(&ctx.job_name));
            }

            ctx.logger.phase(step_name);
            let percent = ((i as f64 / total_steps as f64) * 100.0) as u32;
            ctx.report_progress(step_name, percent, &format!("Starting {}", step_name));

            match self.run_step(step.as_ref(), ctx, state) {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
                Err(StepError::Cancelled) => {
                    ctx.logger.warn(&format!("Pipeline cancelled during step '{}'", step_name));
                    return Err(PipelineError::cancelled(&ctx.job_name));
                }
                Err(e) => {
                    return Err(PipelineError::step_failed(&ctx.job_name, step_name, e));
                }
            }
        }

        ctx.report_progress("Complete", 100, "Pipeline finished");
        ctx.logger.success("Pipeline completed successfully");

        Ok(result)
    }

    /// Validate, execute and (on success) verify a single step.
    fn run_step(
        &self,
        step: &dyn PipelineStep,
        ctx: &Context,
        state: &mut JobState,
    ) -> Result<StepOutcome, StepError> {
        let step_name = step.name();

        ctx.logger.debug(&format!("Validating input for '{}'", step_name));
        step.validate_input(ctx).inspect_err(|e| {
            ctx.logger.error(&format!("Input validation failed: {}", e));
        })?;

        ctx.logger.debug(&format!("Executing '{}'", step_name));
        let outcome = step.execute(ctx, state).inspect_err(|e| {
            if !e.is_cancelled() {
                ctx.logger.error(&format!("Execution failed: {}", e));
            }
        })?;

        if outcome == StepOutcome::Success {
            ctx.logger
                .debug(&format!("Validating output for '{}'", step_name));
            step.validate_output(ctx, state).inspect_err(|e| {
                ctx.logger.error(&format!("Output validation failed: {}", e));
            })?;
        }

        Ok(outcome)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared cancellation flag.
///
/// Clones share the same flag, so a handle given to a Ctrl-C handler
/// cancels every context built with it.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Running steps stop before their next ffmpeg run; the pipeline
    /// stops at the next step boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    /// Check if all steps completed (none skipped).
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}
