use std::path::Path;

use crate::{AppError, Config, ValidationResult};

/// Main application state and lifecycle manager
pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance from the validated on-disk config
    pub fn new() -> Result<Self, AppError> {
        Config::load_validated()
            .map(Self::from_validated)
            .map_err(AppError::from_config_failure)
    }

    /// Create an application instance from the config file at `config_path`
    pub fn open(config_path: &Path) -> Result<Self, AppError> {
        Config::load_validated_from(config_path)
            .map(Self::from_validated)
            .map_err(AppError::from_config_failure)
    }

    fn from_validated((config, validation): (Config, ValidationResult)) -> Self {
        tracing::debug!(
            "Loaded configuration with {} warnings",
            validation.warnings.len()
        );
        Self::with_config(config)
    }

    /// Create an application instance around an already loaded config
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Prepare local storage so the database can be opened
    pub fn initialize(&self) -> Result<(), AppError> {
        if let Some(parent) = self.database_path().parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(
            "Application initialized (database: {})",
            self.database_path().display()
        );
        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&self) -> Result<(), AppError> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Location of the SQLite database
    pub fn database_path(&self) -> &Path {
        &self.config.storage.database_path
    }
}
