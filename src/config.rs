//! Configuration system using Figment
//!
//! Configuration is loaded from:
//! 1. `config/signal_panes.toml` (base configuration, optional)
//! 2. Environment variables (prefixed with `SIGNAL_PANES_`)
//!
//! Every field has a default, so an absent file yields [`AppConfig::default`].
//!
//! # Example
//! ```no_run
//! use signal_panes::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("Quiet period: {} ms", config.scheduler.quiet_period_ms);
//! # Ok::<(), signal_panes::error::PlotError>(())
//! ```

use crate::error::{AppResult, PlotError};
use crate::ingest::{DEFAULT_DELIMITER, DEFAULT_TIME_COLUMN};
use crate::layout::LayoutMode;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/signal_panes.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Debounce settings
    pub scheduler: SchedulerConfig,
    /// Upload parsing settings
    pub ingestion: IngestionConfig,
    /// Control table settings
    pub table: TableConfig,
    /// Pane layout settings
    pub layout: LayoutConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "Signal Panes".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Mutation scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Quiet period before a flush, in milliseconds
    pub quiet_period_ms: u64,
    /// Session command queue capacity
    pub command_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 300,
            command_capacity: 32,
        }
    }
}

impl SchedulerConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// Upload parsing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Field delimiter (single ASCII character)
    pub delimiter: char,
    /// Name of the time axis column
    pub time_column: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER as char,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
        }
    }
}

impl IngestionConfig {
    /// Delimiter as a byte, as expected by the reader.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

/// Control table configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Whether the synthetic "Toggle All" row is shown first
    pub show_toggle_all_row: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            show_toggle_all_row: true,
        }
    }
}

/// Layout configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Initial layout (1x1, 1x2, 2x1, 2x2)
    pub default: LayoutMode,
}

impl AppConfig {
    /// Load configuration from the default file and environment variables
    ///
    /// Environment variables can override configuration with prefix SIGNAL_PANES_
    /// Example: SIGNAL_PANES_APPLICATION__LOG_LEVEL=debug (nested keys split on `__`)
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SIGNAL_PANES_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(PlotError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.scheduler.quiet_period_ms == 0 {
            return Err(PlotError::Configuration(
                "scheduler.quiet_period_ms must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.command_capacity == 0 {
            return Err(PlotError::Configuration(
                "scheduler.command_capacity must be greater than 0".to_string(),
            ));
        }

        if !self.ingestion.delimiter.is_ascii() {
            return Err(PlotError::Configuration(format!(
                "ingestion.delimiter '{}' must be a single ASCII character",
                self.ingestion.delimiter
            )));
        }

        if self.ingestion.time_column.trim().is_empty() {
            return Err(PlotError::Configuration(
                "ingestion.time_column cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
