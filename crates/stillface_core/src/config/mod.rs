//! Configuration management for the phase cutter.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use stillface_core::config::{ConfigManager, ConfigSection};
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new(".config/stillface.toml");
//! config.load_or_create().unwrap();
//!
//! // Read settings
//! println!("Database: {}", config.settings().paths.db_dir);
//!
//! // Modify a setting
//! config.settings_mut().cutting.reencode = true;
//!
//! // Save just the cutting section atomically
//! config.update_section(ConfigSection::Cutting).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, CuttingSettings, LoggingSettings, PathSettings, Settings, StackingSettings,
    ToolSettings,
};
