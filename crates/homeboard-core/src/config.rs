use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Calendar behaviour
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Task boards shown on the dashboard
    #[serde(default)]
    pub boards: BoardsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file holding events, tasks, folders, notes and settings
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("homeboard")
        .join("homeboard.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// What happens to generated occurrences when their parent event is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Delete the children together with the parent
    #[default]
    Cascade,
    /// Keep the children as standalone events
    Orphan,
    /// Refuse to delete a parent that still has children
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Time of day (HH:MM) after which an all-day event counts as past
    #[serde(default = "default_all_day_cutoff")]
    pub all_day_cutoff: String,

    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

fn default_all_day_cutoff() -> String {
    "12:00".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            all_day_cutoff: default_all_day_cutoff(),
            delete_policy: DeletePolicy::default(),
        }
    }
}

impl CalendarConfig {
    /// Parsed cutoff, if the configured value is a valid `HH:MM` time.
    pub fn cutoff_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(self.all_day_cutoff.trim(), "%H:%M").ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardsConfig {
    /// Board (owner) names, in display order
    #[serde(default = "default_board_names")]
    pub names: Vec<String>,
}

fn default_board_names() -> Vec<String> {
    vec!["jaclyn".to_string(), "river".to_string()]
}

impl Default for BoardsConfig {
    fn default() -> Self {
        Self {
            names: default_board_names(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("homeboard");

        Self {
            config_dir,
            storage: StorageConfig::default(),
            calendar: CalendarConfig::default(),
            boards: BoardsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_from(&Self::config_path()?)
    }

    /// Load and validate configuration from an explicit path
    ///
    /// Parse failures carry `ConfigError::ParseError`, failed validation
    /// carries `ConfigError::Invalid`.
    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(config_path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        // Validate database path
        if self.storage.database_path.as_os_str().is_empty() {
            result.add_error("storage.database_path", "Database path cannot be empty");
        } else if self.storage.database_path.is_dir() {
            result.add_error(
                "storage.database_path",
                format!(
                    "Path is a directory: {}",
                    self.storage.database_path.display()
                ),
            );
        }

        // Validate all-day cutoff
        if self.calendar.cutoff_time().is_none() {
            result.add_error(
                "calendar.all_day_cutoff",
                format!(
                    "Expected a time like 12:00, got: {}",
                    self.calendar.all_day_cutoff
                ),
            );
        }

        // Validate boards
        if self.boards.names.is_empty() {
            result.add_warning("boards.names", "No task boards configured");
        }
        if self.boards.names.iter().any(|name| name.trim().is_empty()) {
            result.add_error("boards.names", "Board names cannot be blank");
        }
        let mut seen = std::collections::HashSet::new();
        if self
            .boards
            .names
            .iter()
            .any(|name| !seen.insert(name.to_lowercase()))
        {
            result.add_warning("boards.names", "Duplicate board names will share tasks");
        }

        result
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("no platform config directory".to_string()))?
            .join("homeboard");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        // Default config should be valid (only warnings, no errors)
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_cutoff() {
        let mut config = Config::default();
        config.calendar.all_day_cutoff = "noon".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "calendar.all_day_cutoff"));
    }

    #[test]
    fn test_cutoff_time_parses() {
        let mut calendar = CalendarConfig::default();
        assert_eq!(calendar.cutoff_time(), NaiveTime::from_hms_opt(12, 0, 0));
        calendar.all_day_cutoff = "18:30".to_string();
        assert_eq!(calendar.cutoff_time(), NaiveTime::from_hms_opt(18, 30, 0));
    }

    #[test]
    fn test_empty_boards_is_warning() {
        let mut config = Config::default();
        config.boards.names.clear();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "boards.names"));
    }

    #[test]
    fn test_blank_board_name_is_error() {
        let mut config = Config::default();
        config.boards.names.push("  ".to_string());
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_database_path_directory_is_error() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path = dir.path().to_path_buf();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "storage.database_path"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.calendar.delete_policy = DeletePolicy::Block;
        config.boards.names = vec!["alex".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.calendar.delete_policy, DeletePolicy::Block);
        assert_eq!(loaded.boards.names, vec!["alex".to_string()]);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.calendar.delete_policy, DeletePolicy::Cascade);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = \"/tmp/homeboard\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.calendar.all_day_cutoff, "12:00");
        assert_eq!(config.boards.names.len(), 2);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[calendar\nall_day_cutoff = 12\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_failed_validation_is_invalid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.calendar.all_day_cutoff = "noon".to_string();
        config.save_to(&path).unwrap();

        let err = Config::load_validated_from(&path).unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Invalid(summary)) => {
                assert!(summary.contains("calendar.all_day_cutoff"))
            }
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
