//! Custom error types for the engine.
//!
//! This module defines the primary error type, `PlotError`, shared by every component of
//! a plotting session. Using the `thiserror` crate, it provides a consistent way to report
//! failures from ingestion, visibility mutations, pane synchronization and configuration.
//!
//! ## Error Hierarchy
//!
//! - **`DuplicateSource`**: a file identifier that was already ingested was uploaded again.
//!   Recovered locally and shown to the user as a warning; the catalog is left untouched.
//! - **`UnknownSignal`**: the visibility matrix was queried or mutated for a signal the
//!   catalog does not know. This is a contract violation upstream; the offending call is
//!   aborted before anything is written.
//! - **`EmptySelection`**: a "selected rows" bulk action ran while no rows were selected.
//!   Recovered locally and shown to the user as a warning.
//! - **`MissingTimeColumn`**: an uploaded table has no time axis column. Rejected at the
//!   ingestion boundary.
//! - **`Config`** / **`Configuration`**: loading or semantic validation of settings failed.
//! - **`SessionClosed`**: a command was sent to a session whose actor task has stopped.
//!
//! By using `#[from]`, `PlotError` can be created from the underlying error types,
//! simplifying error handling with the `?` operator.

use crate::catalog::SignalId;
use thiserror::Error;

/// Convenience alias for results using the engine error type.
pub type AppResult<T> = std::result::Result<T, PlotError>;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("File '{0}' has already been uploaded")]
    DuplicateSource(String),

    #[error("Unknown signal '{0}'")]
    UnknownSignal(SignalId),

    #[error("No rows selected")]
    EmptySelection,

    #[error("File '{source_file}' has no '{column}' column")]
    MissingTimeColumn { source_file: String, column: String },

    #[error("Pane index {0} is out of range (expected 0-3)")]
    InvalidPane(usize),

    #[error("Unknown table column '{0}'")]
    InvalidColumnKey(String),

    #[error("Invalid zoom range [{start}, {end}]")]
    InvalidRange { start: f64, end: f64 },

    #[error("Unknown layout '{0}' (expected 1x1, 1x2, 2x1 or 2x2)")]
    InvalidLayout(String),

    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("Session is no longer running")]
    SessionClosed,
}

impl PlotError {
    /// Whether the error is a recoverable condition that should be surfaced to the
    /// user as a warning instead of being propagated as a failure.
    pub fn is_user_warning(&self) -> bool {
        matches!(
            self,
            PlotError::DuplicateSource(_) | PlotError::EmptySelection
        )
    }
}

impl From<figment::Error> for PlotError {
    fn from(value: figment::Error) -> Self {
        PlotError::Config(Box::new(value))
    }
}
