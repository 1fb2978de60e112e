//! Pipeline orchestrator for coordinating job execution.
//!
//! This module provides the infrastructure for running multi-step
//! processing pipelines. Each job consists of a sequence of steps
//! that validate, execute, and record their results.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Cut        (camera × phase clips)
//!     ├── Step: Stack      (mother/baby + 2x2 composites, optional)
//!     └── Step: Thumbnail  (stillface grid mid-frame)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stillface_core::orchestrator::{create_cut_pipeline, Context, JobState};
//!
//! let pipeline = create_cut_pipeline();
//!
//! let ctx = Context::new(job, settings, "686527", logger, runner);
//! let mut state = JobState::new("686527");
//!
//! let result = pipeline.run(&ctx, &mut state)?;
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{CutStep, StackStep, ThumbnailStep};
pub use types::{
    Context, CutOutput, JobState, ProgressCallback, StackOutput, StepOutcome, ThumbnailOutput,
    MANIFEST_FILE_NAME,
};

/// Create the cutting pipeline.
///
/// 1. Cut - slice every synced camera into phase clips
/// 2. Stack - build the composites (skipped when disabled)
pub fn create_cut_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(CutStep::new())
        .with_step(StackStep::new())
}

/// Create the pipeline that re-stacks clips already on disk.
pub fn create_stack_pipeline() -> Pipeline {
    Pipeline::new().with_step(StackStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_pipeline_order() {
        assert_eq!(create_cut_pipeline().step_names(), vec!["Cut", "Stack"]);
        assert_eq!(create_stack_pipeline().step_names(), vec!["Stack"]);
    }
}
