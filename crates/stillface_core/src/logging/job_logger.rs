//! Per-job logger with file and callback output.
//!
//! Each job gets its own logger that:
//! - Writes to a dedicated log file
//! - Sends messages to a callback (if provided)
//! - Mirrors warnings and errors into `tracing` (file only, see [`JOB_LOG_TARGET`])
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer of tool output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};
use super::JOB_LOG_TARGET;

/// Per-job logger with dual output (file + callback).
pub struct JobLogger {
    /// Job name for identification.
    job_name: String,
    /// Path to log file.
    log_path: PathBuf,
    /// File writer (buffered).
    file_writer: Arc<Mutex<Option<BufWriter<File>>>>,
    /// Callback for console output.
    callback: Arc<Mutex<Option<LogCallback>>>,
    /// Logging configuration.
    config: LogConfig,
    /// Tail buffer for recent tool output lines.
    tail_buffer: Arc<Mutex<VecDeque<String>>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Arc<Mutex<Option<u32>>>,
}

impl JobLogger {
    /// Create a new job logger.
    ///
    /// # Arguments
    /// * `job_name` - Name of the job (used in log filename)
    /// * `log_dir` - Directory to write log file to
    /// * `config` - Logging configuration
    /// * `callback` - Optional callback for console output
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            job_name,
            log_path,
            file_writer: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
            callback: Arc::new(Mutex::new(callback)),
            tail_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(config.error_tail))),
            config,
            last_progress: Arc::new(Mutex::new(None)),
        })
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        tracing::warn!(target: JOB_LOG_TARGET, job = %self.job_name, "{}", message);
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        tracing::error!(target: JOB_LOG_TARGET, job = %self.job_name, "{}", message);
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a section marker.
    pub fn section(&self, section_name: &str) {
        let msg = MessagePrefix::Section.format(section_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        let percent = percent.min(100);
        {
            let mut last = self.last_progress.lock();
            if self.config.compact {
                let step = self.config.progress_step.max(1);

                // Only log when a new step boundary is crossed, and always at 100%
                let crossed = match *last {
                    Some(prev) => percent / step > prev / step,
                    None => percent % step == 0,
                };
                if !crossed && percent < 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        let msg = format!("Progress: {}%", percent);
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Log command output line (for stdout/stderr from external tools).
    ///
    /// In compact mode, these are only added to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 {
                if buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        let msg = format!("{}{}", prefix, line);
        self.output(&self.format_message(&msg));
    }

    /// Show the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    /// Clear the tail buffer.
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release resources.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    /// Format a message with timestamp (if enabled).
    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    /// Output a formatted message to file and callback.
    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Builder for creating JobLogger with fluent API.
pub struct JobLoggerBuilder {
    job_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl JobLoggerBuilder {
    /// Create a new builder.
    pub fn new(job_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_name: job_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            callback: None,
        }
    }

    /// Set the logging configuration.
    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the log level.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Enable or disable compact mode.
    pub fn compact(mut self, compact: bool) -> Self {
        self.config.compact = compact;
        self
    }

    /// Set the output callback.
    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Build the JobLogger.
    pub fn build(self) -> std::io::Result<JobLogger> {
        JobLogger::new(self.job_name, self.log_dir, self.config, self.callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("686527_cut", dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger
            .log_path()
            .to_string_lossy()
            .contains("686527_cut.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job", dir.path(), LogConfig::default(), None).unwrap();

        logger.command("ffmpeg -hide_banner -i baby.mp4");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("$ ffmpeg -hide_banner -i baby.mp4"));
    }

    #[test]
    fn calls_callback() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLoggerBuilder::new("job", dir.path())
            .callback(callback)
            .build()
            .unwrap();

        logger.info("Message 1");
        logger.phase("Cut");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn level_filters_debug() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let logger = JobLoggerBuilder::new("job", dir.path())
            .level(LogLevel::Info)
            .callback(Box::new(move |_msg| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        logger.debug("hidden");
        logger.info("shown");

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..LogConfig::default()
        };

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        assert!(logger.progress(0));
        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            error_tail: 5,
            ..LogConfig::default()
        };

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), true);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");

        logger.clear_tail();
        assert!(logger.get_tail().is_empty());
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("has:colon"), "has_colon");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
