//! Signal catalog.
//!
//! Holds every plottable signal ingested into a session, keyed by
//! `(source_file, name)`. Insertion order is preserved: the first registered file's
//! columns come first, in their original column order.
//!
//! Columns acting as the time axis (or left-over index columns) are filtered out
//! before insertion by [`is_plottable_column`], so the catalog never holds a time-axis
//! signal. The reserved control-table row name [`TOGGLE_ALL_ROW`] is never admitted
//! either.

use crate::error::{AppResult, PlotError};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of the synthetic control-table row that toggles a whole pane column.
pub const TOGGLE_ALL_ROW: &str = "Toggle All";

/// Identity of a signal: the file it came from and its column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId {
    pub source_file: String,
    pub name: String,
}

impl SignalId {
    pub fn new(source_file: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            name: name.into(),
        }
    }

    /// Row key of the synthetic "Toggle All" row (not a real signal).
    pub fn toggle_all() -> Self {
        Self::new("", TOGGLE_ALL_ROW)
    }

    /// True for the synthetic "Toggle All" row key.
    pub fn is_toggle_all(&self) -> bool {
        self.name == TOGGLE_ALL_ROW
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_file, self.name)
    }
}

/// A named column of samples, as handed over by the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalColumn {
    pub name: String,
    pub samples: Vec<f64>,
}

impl SignalColumn {
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    /// Column without sample data (identity only).
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// One plottable signal. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Signal {
    id: SignalId,
    samples: Arc<[f64]>,
    time_axis: Arc<[f64]>,
}

impl Signal {
    pub fn id(&self) -> &SignalId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn source_file(&self) -> &str {
        &self.id.source_file
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Time axis shared by all signals of the same source file.
    pub fn time_axis(&self) -> &Arc<[f64]> {
        &self.time_axis
    }
}

/// Decides whether an ingested column becomes a plottable signal.
///
/// A column is excluded iff its name case-insensitively contains `"time"` or
/// `"unnamed"`. Note that this also excludes legitimately named columns such as
/// `"Timestamp2"` or `"Runtime"`.
pub fn is_plottable_column(name: &str) -> bool {
    let lowered = name.to_lowercase();
    !(lowered.contains("time") || lowered.contains("unnamed"))
}

/// Ordered set of signals for one session.
#[derive(Debug, Default)]
pub struct SignalCatalog {
    signals: IndexMap<SignalId, Signal>,
    processed_sources: IndexSet<String>,
}

impl SignalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the columns of a newly uploaded file.
    ///
    /// Returns the signals actually added. Uploading a `source_file` that was already
    /// processed fails with [`PlotError::DuplicateSource`] and leaves the catalog unchanged.
    pub fn register_file(
        &mut self,
        source_file: &str,
        time_axis: Arc<[f64]>,
        columns: Vec<SignalColumn>,
    ) -> AppResult<Vec<Signal>> {
        if self.processed_sources.contains(source_file) {
            return Err(PlotError::DuplicateSource(source_file.to_string()));
        }
        self.processed_sources.insert(source_file.to_string());

        let mut added = Vec::new();
        for column in columns {
            if !is_plottable_column(&column.name) || column.name == TOGGLE_ALL_ROW {
                tracing::debug!(source_file, column = %column.name, "Column excluded from catalog");
                continue;
            }
            let id = SignalId::new(source_file, column.name);
            if self.signals.contains_key(&id) {
                tracing::debug!(signal = %id, "Duplicate column ignored");
                continue;
            }
            let signal = Signal {
                id: id.clone(),
                samples: column.samples.into(),
                time_axis: time_axis.clone(),
            };
            self.signals.insert(id, signal.clone());
            added.push(signal);
        }

        tracing::info!(source_file, added = added.len(), "File registered");
        Ok(added)
    }

    /// All signals in insertion order.
    pub fn all_signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.values()
    }

    pub fn get(&self, id: &SignalId) -> Option<&Signal> {
        self.signals.get(id)
    }

    pub fn contains(&self, id: &SignalId) -> bool {
        self.signals.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Number of files processed so far (shown in the control-table header).
    pub fn source_count(&self) -> usize {
        self.processed_sources.len()
    }

    /// Full application reset: forgets all signals and processed files.
    pub fn reset(&mut self) {
        self.signals.clear();
        self.processed_sources.clear();
    }
}
