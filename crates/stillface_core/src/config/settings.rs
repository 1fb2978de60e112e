//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::Camera;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Phase cutting options.
    #[serde(default)]
    pub cutting: CuttingSettings,

    /// Composite (stacked) video options.
    #[serde(default)]
    pub stacking: StackingSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for the session database and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root of the session database (contains `Sessions/`).
    #[serde(default = "default_db_dir")]
    pub db_dir: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_db_dir() -> String {
    "data/ELTE-PPK_StillFace".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            db_dir: default_db_dir(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Locations of the ffmpeg executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name resolved through PATH, or a full path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// ffprobe executable.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Phase cutting options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuttingSettings {
    /// Re-encode clips (libx264/aac) instead of stream copy.
    ///
    /// Stream copy cuts on the nearest keyframe; re-encoding is slower
    /// but starts exactly at the requested second.
    #[serde(default)]
    pub reencode: bool,
}

/// Composite video options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingSettings {
    /// Build mother/baby and 2x2 composites after cutting.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Regenerate composites that already exist.
    #[serde(default)]
    pub overwrite: bool,

    /// Camera whose audio track is kept in the 2x2 grid.
    #[serde(default = "default_audio_source")]
    pub audio_source: Camera,

    /// Width of the black placeholder for a missing camera.
    #[serde(default = "default_placeholder_width")]
    pub placeholder_width: u32,

    /// Height of the black placeholder for a missing camera.
    #[serde(default = "default_placeholder_height")]
    pub placeholder_height: u32,

    /// Frame rate of the black placeholder.
    #[serde(default = "default_placeholder_fps")]
    pub placeholder_fps: u32,

    /// Duration of the black placeholder; `-shortest` trims the grid.
    #[serde(default = "default_placeholder_duration")]
    pub placeholder_duration_secs: u32,
}

fn default_true() -> bool {
    true
}

fn default_audio_source() -> Camera {
    Camera::Baby
}

fn default_placeholder_width() -> u32 {
    1920
}

fn default_placeholder_height() -> u32 {
    1080
}

fn default_placeholder_fps() -> u32 {
    60
}

fn default_placeholder_duration() -> u32 {
    300
}

impl Default for StackingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            overwrite: false,
            audio_source: default_audio_source(),
            placeholder_width: default_placeholder_width(),
            placeholder_height: default_placeholder_height(),
            placeholder_fps: default_placeholder_fps(),
            placeholder_duration_secs: default_placeholder_duration(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show on error.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Minimum level for application logging.
    #[serde(default)]
    pub level: LogLevel,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            level: LogLevel::default(),
        }
    }
}

/// Config sections for section-level updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Cutting,
    Stacking,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Cutting,
        ConfigSection::Stacking,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Cutting => "cutting",
            ConfigSection::Stacking => "stacking",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Session database and log directories",
            ConfigSection::Tools => "# External ffmpeg/ffprobe executables",
            ConfigSection::Cutting => "# Phase cutting",
            ConfigSection::Stacking => "# Mother/baby and 2x2 composites",
            ConfigSection::Logging => "# Logging configuration",
        }
    }
}
