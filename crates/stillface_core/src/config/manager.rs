//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Validation on load (removes unknown sections)
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Note: Changes made here are only in memory until `save()` or
    /// `update_section()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating with defaults if it doesn't exist.
    ///
    /// Also validates and cleans up the config, saving if changes were made.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Rewriting cleaned config {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Get the logs folder path.
    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Get the session database root.
    pub fn db_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.db_dir)
    }

    /// Parse, validate, and clean up config content.
    ///
    /// Returns the settings and whether any modifications were made.
    fn parse_validate_and_clean(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse()?;

        // Missing fields fall back to their defaults here
        let settings: Settings = toml::from_str(content)?;

        let valid_sections: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        let has_unknown = doc.iter().any(|(key, _)| !valid_sections.contains(&key));
        if has_unknown {
            tracing::warn!(
                "Config {} contains unknown sections; they will be removed",
                self.config_path.display()
            );
        }

        // Any missing section or key shows up as a difference from the canonical form
        let canonical: DocumentMut = generate_config_with_comments(&settings)?.parse()?;
        let was_modified = has_unknown || !same_keys(&doc, &canonical);

        Ok((settings, was_modified))
    }

    /// Save the entire config atomically.
    ///
    /// Writes to a temp file first, then renames to ensure atomic write.
    pub fn save(&self) -> ConfigResult<()> {
        let content = generate_config_with_comments(&self.settings)?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// This re-reads the file from disk, updates only the specified section,
    /// and writes back atomically. Other sections keep their on-disk content
    /// and comments.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = section_toml(&self.settings, section)?.parse()?;
        let section_table = section_doc.as_table().clone();

        doc[section.table_name()] = Item::Table(section_table);

        self.atomic_write(&doc.to_string())?;

        Ok(())
    }

    /// Write content to config file atomically.
    ///
    /// Writes to a temp file first, then renames.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Same directory as the target so the rename stays on one filesystem
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// Serialize one section's fields (without the table header).
fn section_toml(settings: &Settings, section: ConfigSection) -> Result<String, toml::ser::Error> {
    match section {
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths),
        ConfigSection::Tools => toml::to_string_pretty(&settings.tools),
        ConfigSection::Cutting => toml::to_string_pretty(&settings.cutting),
        ConfigSection::Stacking => toml::to_string_pretty(&settings.stacking),
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging),
    }
}

/// Generate config content with helpful comments.
fn generate_config_with_comments(settings: &Settings) -> ConfigResult<String> {
    let mut output = String::new();

    output.push_str("# Still-Face phase cutter configuration\n");
    output.push_str(
        "# This file is auto-generated. Comments may be preserved on section updates.\n",
    );

    for section in ConfigSection::ALL {
        output.push('\n');
        output.push_str(section.comment());
        output.push('\n');
        output.push_str(&format!("[{}]\n", section.table_name()));
        for line in section_toml(settings, section)?.lines() {
            output.push_str(line);
            output.push('\n');
        }
    }

    Ok(output)
}

/// Whether two documents have the same tables and keys (values ignored).
fn same_keys(a: &DocumentMut, b: &DocumentMut) -> bool {
    let keys = |doc: &DocumentMut| -> Vec<String> {
        let mut keys = Vec::new();
        for (table, item) in doc.iter() {
            keys.push(table.to_string());
            if let Some(t) = item.as_table_like() {
                keys.extend(t.iter().map(|(k, _)| format!("{}.{}", table, k)));
            }
        }
        keys.sort();
        keys
    };
    keys(a) == keys(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Camera;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("stillface.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[tools]"));
        assert!(content.contains("[stacking]"));
        assert!(content.contains("# Phase cutting"));
    }

    #[test]
    fn generated_config_round_trips() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("stillface.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().paths.db_dir, "data/ELTE-PPK_StillFace");
        assert_eq!(reloaded.settings().stacking.placeholder_fps, 60);
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("stillface.toml");

        fs::write(&config_path, "[paths]\ndb_dir = \"/srv/stillface\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.db_dir, "/srv/stillface");

        // Missing sections were filled in on disk
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("/srv/stillface"));
        assert!(content.contains("[stacking]"));
    }

    #[test]
    fn load_or_create_removes_unknown_sections() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("stillface.toml");

        fs::write(&config_path, "[chapters]\nsnap = true\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("[chapters]"));
    }

    #[test]
    fn load_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("stillface.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        // Hand-edit paths on disk; an update of another section must keep it
        let content = fs::read_to_string(&config_path).unwrap();
        fs::write(
            &config_path,
            content.replace("data/ELTE-PPK_StillFace", "/mnt/edited"),
        )
        .unwrap();

        manager.settings_mut().stacking.audio_source = Camera::Mother;
        manager.update_section(ConfigSection::Stacking).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("audio_source = \"mother\""));
        assert!(content.contains("/mnt/edited"));
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("stillface.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}
