//! Execution of ffmpeg/ffprobe child processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::command::{duration_probe_args, FfmpegCommand};
use crate::config::ToolSettings;
use crate::logging::JobLogger;
use crate::orchestrator::{StepError, StepResult};

/// Runs ffmpeg commands, logging each command line and its output.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// ffmpeg executable (bare names are resolved through PATH).
    ffmpeg: PathBuf,
    /// ffprobe executable.
    ffprobe: PathBuf,
    /// Log commands without executing them.
    dry_run: bool,
}

impl FfmpegRunner {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            dry_run: false,
        }
    }

    /// Build from the `[tools]` config section.
    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self::new(&tools.ffmpeg, &tools.ffprobe)
    }

    /// Only log commands, never spawn processes.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run an ffmpeg command to completion.
    ///
    /// Creates the output's parent directory first. A non-zero exit becomes
    /// [`StepError::CommandFailed`] carrying the last line ffmpeg printed.
    pub fn run(&self, cmd: &FfmpegCommand, logger: &JobLogger) -> StepResult<()> {
        let program = self.ffmpeg.to_string_lossy();
        logger.command(&cmd.to_command_line(&program));

        if self.dry_run {
            logger.debug("Dry run: command not executed");
            return Ok(());
        }

        if let Some(parent) = cmd.output().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StepError::io_error("creating output directory", e))?;
            }
        }

        let result = Command::new(&self.ffmpeg)
            .args(cmd.get_args())
            .output()
            .map_err(|e| StepError::io_error(format!("executing {}", program), e))?;

        let stdout = String::from_utf8_lossy(&result.stdout);
        for line in stdout.lines() {
            logger.output_line(line, false);
        }
        let stderr = String::from_utf8_lossy(&result.stderr);
        for line in stderr.lines() {
            logger.output_line(line, true);
        }

        if !result.status.success() {
            logger.show_tail("ffmpeg output");
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no error output")
                .to_string();
            return Err(StepError::command_failed(
                "ffmpeg",
                result.status.code().unwrap_or(-1),
                message,
            ));
        }

        Ok(())
    }

    /// Container duration of `input` in seconds, via ffprobe.
    ///
    /// Returns 0.0 in dry-run mode.
    pub fn probe_duration(&self, input: &Path, logger: &JobLogger) -> StepResult<f64> {
        let args = duration_probe_args(input);
        let program = self.ffprobe.to_string_lossy();
        logger.debug(&format!(
            "$ {} {}",
            program,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        ));

        if self.dry_run {
            return Ok(0.0);
        }

        if !input.exists() {
            return Err(StepError::file_not_found(input.display().to_string()));
        }

        let output = Command::new(&self.ffprobe)
            .args(&args)
            .output()
            .map_err(|e| StepError::io_error(format!("executing {}", program), e))?;

        if !output.status.success() {
            return Err(StepError::command_failed(
                "ffprobe",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::from_settings(&ToolSettings::default())
    }
}

/// Parse ffprobe's `format=duration` output.
fn parse_duration(stdout: &str) -> StepResult<f64> {
    let text = stdout.trim();
    let duration: f64 = text
        .parse()
        .map_err(|e| StepError::parse_error("ffprobe duration", format!("'{}': {}", text, e)))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(StepError::parse_error(
            "ffprobe duration",
            format!("invalid value {}", duration),
        ));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::command::cut_command;
    use crate::logging::LogConfig;
    use tempfile::tempdir;

    #[test]
    fn parses_probe_output() {
        assert!((parse_duration("312.480000\n").unwrap() - 312.48).abs() < 1e-9);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("-1").is_err());
    }

    #[test]
    fn dry_run_logs_without_spawning() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("dry", dir.path(), LogConfig::default(), None).unwrap();
        let runner = FfmpegRunner::new("/nonexistent/ffmpeg", "/nonexistent/ffprobe")
            .with_dry_run(true);

        let range = "00:10-00:20".parse().unwrap();
        let out = dir.path().join("sub").join("clip.mp4");
        let cmd = cut_command(Path::new("in.mp4"), &out, &range, false);

        runner.run(&cmd, &logger).unwrap();
        assert!(!out.exists());
        assert_eq!(runner.probe_duration(Path::new("x.mp4"), &logger).unwrap(), 0.0);

        logger.flush();
        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("$ /nonexistent/ffmpeg -hide_banner"));
    }

    #[test]
    fn missing_executable_is_io_error() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("spawn", dir.path(), LogConfig::default(), None).unwrap();
        let runner = FfmpegRunner::new(dir.path().join("no-such-ffmpeg"), "ffprobe");

        let range = "00:10-00:20".parse().unwrap();
        let cmd = cut_command(Path::new("in.mp4"), &dir.path().join("o.mp4"), &range, false);

        assert!(matches!(
            runner.run(&cmd, &logger),
            Err(StepError::IoError { .. })
        ));
    }
}
