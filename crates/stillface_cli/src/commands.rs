//! Subcommand handlers.
//!
//! Each handler builds a [`JobSpec`], wraps it in a pipeline context and
//! runs the matching pipeline against the shared cancel handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use chrono::Local;

use stillface_core::config::Settings;
use stillface_core::ffmpeg::FfmpegRunner;
use stillface_core::logging::{JobLoggerBuilder, LogConfig, LogLevel};
use stillface_core::models::{Camera, JobSpec, PhaseTimestamps, SubjectId};
use stillface_core::orchestrator::{
    create_cut_pipeline, create_stack_pipeline, CancelHandle, Context, JobState, Pipeline,
    PipelineError, PipelineResult, PipelineRunResult, ThumbnailStep,
};
use stillface_core::session::{list_subjects, SessionLayout};

use crate::args::{CutArgs, CutOptions, SessionArgs, StackArgs, ThumbnailArgs};

/// Everything a handler needs besides its own arguments.
pub struct App {
    pub settings: Settings,
    pub db_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub runner: FfmpegRunner,
    pub cancel: CancelHandle,
}

impl App {
    /// Run `pipeline` over `job`, returning the final state.
    fn run_pipeline(
        &self,
        settings: Settings,
        job: JobSpec,
        job_name: &str,
        pipeline: Pipeline,
    ) -> Result<JobState> {
        let (state, result) = self.run_job(settings, job, job_name, pipeline)?;
        result?;
        Ok(state)
    }

    /// Run `pipeline` over `job`, keeping the state even when a step fails.
    fn run_job(
        &self,
        settings: Settings,
        job: JobSpec,
        job_name: &str,
        pipeline: Pipeline,
    ) -> Result<(JobState, PipelineResult<PipelineRunResult>)> {
        let logger = JobLoggerBuilder::new(job_name, self.logs_dir.join("jobs"))
            .config(LogConfig::from_settings(&settings.logging))
            .callback(Box::new(|line| eprintln!("{}", line)))
            .build()
            .with_context(|| format!("Failed to create job log in {}", self.logs_dir.display()))?;
        let logger = Arc::new(logger);

        logger.info(&format!("Job {} (stillface {})", job_name, stillface_core::version()));
        logger.debug(&format!("Steps: {}", pipeline.step_names().join(" -> ")));

        let ctx = Context::new(job, settings, job_name, Arc::clone(&logger), self.runner.clone())
            .with_cancel_handle(self.cancel.clone());
        let mut state = JobState::new(job_name);

        let result = pipeline.run(&ctx, &mut state);

        if let Ok(ref run) = result {
            if !run.steps_skipped.is_empty() {
                logger.info(&format!("Skipped: {}", run.steps_skipped.join(", ")));
            }
        }
        logger.info(&format!("Log file: {}", logger.log_path().display()));
        logger.flush();

        Ok((state, result))
    }

    /// Run the cut pipeline and write the manifest into the output directory.
    ///
    /// The manifest is written whenever the Cut step recorded its results,
    /// including runs where clips or composites failed.
    fn cut(&self, job: JobSpec, job_name: &str, options: &CutOptions) -> Result<()> {
        let mut settings = self.settings.clone();
        if options.no_stack {
            settings.stacking.enabled = false;
        }
        if options.reencode {
            settings.cutting.reencode = true;
        }

        let out_dir = job.out_dir.clone();
        let (state, result) = self.run_job(settings, job, job_name, create_cut_pipeline())?;

        if state.has_cut() {
            if self.runner.is_dry_run() {
                tracing::info!("Dry run: manifest not written");
            } else {
                let manifest = state
                    .save_manifest(&out_dir)
                    .context("Failed to write cut manifest")?;
                tracing::info!("Manifest written to {}", manifest.display());
            }
        }

        result?;

        if let Some(cut) = state.cut.as_ref() {
            if !cut.failed.is_empty() {
                bail!("{} clip(s) failed to cut: {}", cut.failed.len(), cut.failed.join(", "));
            }
        }
        Ok(())
    }

    fn db_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir.map(Path::to_path_buf).unwrap_or_else(|| self.db_dir.clone())
    }
}

/// Job name like `686527_cut_20261019_141502`.
fn job_name(prefix: &str, action: &str) -> String {
    format!("{}_{}_{}", prefix, action, Local::now().format("%Y%m%d_%H%M%S"))
}

fn selected_cameras(options: &CutOptions) -> Vec<Camera> {
    if options.cameras.is_empty() {
        Camera::ALL.to_vec()
    } else {
        options.cameras.clone()
    }
}

fn log_timestamps(timestamps: &PhaseTimestamps) {
    for (phase, range) in timestamps.iter() {
        tracing::debug!("{} = {}", phase, range);
    }
}

/// Job for one session of the database.
fn session_job(layout: &SessionLayout) -> JobSpec {
    JobSpec::new(layout.synced_dir(), layout.processed_dir())
        .with_visualize_dir(layout.visualize_dir())
}

pub fn cut(app: &App, args: CutArgs) -> Result<()> {
    let timestamps = args.timestamps();
    log_timestamps(&timestamps);

    let mut job = JobSpec::new(&args.synced_dir, &args.out_dir)
        .with_timestamps(timestamps)
        .with_cameras(selected_cameras(&args.options));
    if let Some(ref dir) = args.visualize_dir {
        job = job.with_visualize_dir(dir);
    }

    app.cut(job, &job_name("cut", "job"), &args.options)
}

pub fn session(app: &App, args: SessionArgs) -> Result<()> {
    let timestamps = args.timestamps();
    log_timestamps(&timestamps);

    let layout = SessionLayout::new(app.db_dir(args.db_dir.as_deref()), args.subject.clone());
    if !layout.session_dir().is_dir() {
        bail!("Session directory not found: {}", layout.session_dir().display());
    }

    let job = session_job(&layout)
        .with_timestamps(timestamps)
        .with_cameras(selected_cameras(&args.options));

    app.cut(job, &job_name(args.subject.as_str(), "cut"), &args.options)
}

pub fn stack(app: &App, args: StackArgs) -> Result<()> {
    let layout = SessionLayout::new(app.db_dir(args.db_dir.as_deref()), args.subject.clone());
    let processed = layout.processed_dir();
    if !processed.is_dir() {
        bail!("No processed clips for {}: {} does not exist", args.subject, processed.display());
    }

    let mut settings = app.settings.clone();
    settings.stacking.enabled = true;
    if args.overwrite {
        settings.stacking.overwrite = true;
    }

    let state = app.run_pipeline(
        settings,
        session_job(&layout),
        &job_name(args.subject.as_str(), "stack"),
        create_stack_pipeline(),
    )?;

    if let Some(stack) = state.stack {
        println!(
            "{}: {} mother/baby composite(s), {} grid(s) in {}",
            args.subject,
            stack.mother_baby.len(),
            stack.grids.len(),
            layout.visualize_dir().display()
        );
    }
    Ok(())
}

pub fn thumbnail(app: &App, args: ThumbnailArgs) -> Result<()> {
    let db_dir = app.db_dir(args.db_dir.as_deref());

    if let Some(subject) = args.subject {
        return thumbnail_for(app, &db_dir, subject);
    }

    let subjects = list_subjects(&db_dir).context("Failed to list sessions")?;
    if subjects.is_empty() {
        println!("No sessions found in {}", db_dir.display());
        return Ok(());
    }

    let mut failed = Vec::new();
    for subject in subjects {
        if let Err(e) = thumbnail_for(app, &db_dir, subject.clone()) {
            if is_cancelled(&e) {
                return Err(e);
            }
            tracing::warn!("Thumbnail for {} failed: {:#}", subject, e);
            failed.push(subject.to_string());
        }
    }

    if !failed.is_empty() {
        println!("No thumbnail for: {}", failed.join(", "));
    }
    Ok(())
}

fn thumbnail_for(app: &App, db_dir: &Path, subject: SubjectId) -> Result<()> {
    let layout = SessionLayout::new(db_dir, subject);
    let targets = vec![layout.thumbnail_path(), layout.overview_thumbnail_path()];
    let pipeline = Pipeline::new().with_step(ThumbnailStep::new(targets));

    let state = app.run_pipeline(
        app.settings.clone(),
        session_job(&layout),
        &job_name(layout.subject().as_str(), "thumbnail"),
        pipeline,
    )?;

    if let Some(thumb) = state.thumbnail {
        for path in &thumb.written {
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Whether an error chain stems from a cancelled pipeline.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<PipelineError>()
            .is_some_and(PipelineError::is_cancelled)
    })
}

/// Effective log level after the `--verbose` flag.
pub fn log_level(settings: &Settings, verbose: bool) -> LogLevel {
    if verbose {
        LogLevel::Debug
    } else {
        settings.logging.level
    }
}
