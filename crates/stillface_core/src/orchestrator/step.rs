//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// Trait for pipeline steps.
///
/// Each step in the pipeline implements this trait. The pipeline runner
/// calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct CutStep;
///
/// impl PipelineStep for CutStep {
///     fn name(&self) -> &str { "Cut" }
///
///     fn validate_input(&self, ctx: &Context) -> StepResult<()> {
///         if ctx.job.timestamps.is_none() {
///             return Err(StepError::invalid_input("No phase timestamps"));
///         }
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
///         // Cut the clips...
///         state.cut = Some(CutOutput { ... });
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         if !state.has_cut() {
///             return Err(StepError::invalid_output("Cut not recorded"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Validate inputs before execution.
    ///
    /// Called before `execute`. Should check that all required
    /// preconditions are met (input files exist, timestamps given, etc.).
    ///
    /// Return `Ok(())` if validation passes, or `Err(StepError)` if not.
    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Should perform the step's processing and record results in `state`.
    /// Use `ctx.logger` for logging and `ctx.runner` to invoke ffmpeg.
    ///
    /// Returns `StepOutcome::Success` on completion, or `StepOutcome::Skipped`
    /// if the step determined it should be skipped (not an error).
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    /// Validate outputs after execution.
    ///
    /// Called after `execute` returns `Success`. Should verify that
    /// the step produced valid output (files exist, state populated, etc.).
    ///
    /// Return `Ok(())` if validation passes, or `Err(StepError)` if not.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Whether this step can be skipped.
    ///
    /// Some steps are optional based on job configuration.
    /// Default is `false` (step is required).
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
