//! Visibility matrix.
//!
//! The single writable source of truth for which signal is drawn in which pane.
//! Every registered signal owns exactly one entry per pane, created `true` at
//! registration time, before anything is rendered.
//!
//! All mutation methods return a [`ChangeSet`] listing only the `(signal, pane)`
//! pairs whose value actually changed, which the scheduler turns into render
//! deltas. Each call is atomic: every referenced signal is validated before the
//! first write, so a failed call never leaves a partially applied state.

use crate::catalog::{SignalId, TOGGLE_ALL_ROW};
use crate::error::{AppResult, PlotError};
use crate::pane::{PaneIndex, PANE_COUNT};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single visibility change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub signal: SignalId,
    pub pane: PaneIndex,
    pub visible: bool,
}

/// Changes produced by one mutation call, in application order.
pub type ChangeSet = Vec<CellChange>;

/// Which signals a column mutation touches.
#[derive(Debug, Clone, Copy)]
pub enum ColumnScope<'a> {
    All,
    Selected(&'a [SignalId]),
}

/// One row of the control table.
///
/// Field names match the table's column keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRow {
    pub csv_filename: String,
    pub signal_name: String,
    pub plot1: bool,
    pub plot2: bool,
    pub plot3: bool,
    pub plot4: bool,
}

impl SignalRow {
    fn new(id: &SignalId, values: [bool; PANE_COUNT]) -> Self {
        Self {
            csv_filename: id.source_file.clone(),
            signal_name: id.name.clone(),
            plot1: values[0],
            plot2: values[1],
            plot3: values[2],
            plot4: values[3],
        }
    }

    pub fn key(&self) -> SignalId {
        SignalId::new(self.csv_filename.clone(), self.signal_name.clone())
    }

    pub fn get(&self, pane: PaneIndex) -> bool {
        match pane.index() {
            0 => self.plot1,
            1 => self.plot2,
            2 => self.plot3,
            _ => self.plot4,
        }
    }

    pub fn is_toggle_all(&self) -> bool {
        self.signal_name == TOGGLE_ALL_ROW
    }
}

#[derive(Debug, Default)]
pub struct VisibilityMatrix {
    entries: IndexMap<SignalId, [bool; PANE_COUNT]>,
}

impl VisibilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates four `true` entries for every signal not yet present.
    pub fn register_signals<'a>(&mut self, signals: impl IntoIterator<Item = &'a SignalId>) {
        for signal in signals {
            self.entries
                .entry(signal.clone())
                .or_insert([true; PANE_COUNT]);
        }
    }

    pub fn contains(&self, signal: &SignalId) -> bool {
        self.entries.contains_key(signal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, signal: &SignalId, pane: PaneIndex) -> AppResult<bool> {
        self.entries
            .get(signal)
            .map(|values| values[pane.index()])
            .ok_or_else(|| unknown(signal))
    }

    pub fn set_cell(
        &mut self,
        signal: &SignalId,
        pane: PaneIndex,
        value: bool,
    ) -> AppResult<ChangeSet> {
        let values = self.entries.get_mut(signal).ok_or_else(|| unknown(signal))?;
        let mut changes = ChangeSet::new();
        write(values, signal, pane, value, &mut changes);
        Ok(changes)
    }

    /// Sets `signal` in all four panes.
    pub fn set_row(&mut self, signal: &SignalId, value: bool) -> AppResult<ChangeSet> {
        let values = self.entries.get_mut(signal).ok_or_else(|| unknown(signal))?;
        let mut changes = ChangeSet::new();
        for pane in PaneIndex::ALL {
            write(values, signal, pane, value, &mut changes);
        }
        Ok(changes)
    }

    pub fn set_column(
        &mut self,
        pane: PaneIndex,
        value: bool,
        scope: ColumnScope<'_>,
    ) -> AppResult<ChangeSet> {
        let mut changes = ChangeSet::new();
        match scope {
            ColumnScope::All => {
                for (signal, values) in self.entries.iter_mut() {
                    write(values, signal, pane, value, &mut changes);
                }
            }
            ColumnScope::Selected(selected) => {
                self.ensure_known(selected)?;
                for signal in selected {
                    if let Some(values) = self.entries.get_mut(signal) {
                        write(values, signal, pane, value, &mut changes);
                    }
                }
            }
        }
        Ok(changes)
    }

    /// Sets the given rows in all four panes. Validates every signal first.
    pub fn set_rows(&mut self, selected: &[SignalId], value: bool) -> AppResult<ChangeSet> {
        self.ensure_known(selected)?;
        let mut changes = ChangeSet::new();
        for signal in selected {
            if let Some(values) = self.entries.get_mut(signal) {
                for pane in PaneIndex::ALL {
                    write(values, signal, pane, value, &mut changes);
                }
            }
        }
        Ok(changes)
    }

    /// Sets every signal in every pane.
    pub fn set_all(&mut self, value: bool) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for (signal, values) in self.entries.iter_mut() {
            for pane in PaneIndex::ALL {
                write(values, signal, pane, value, &mut changes);
            }
        }
        changes
    }

    /// True iff every signal is visible in `pane` (vacuously true when empty).
    pub fn column_all_visible(&self, pane: PaneIndex) -> bool {
        self.entries.values().all(|values| values[pane.index()])
    }

    /// Visibility of every signal in `pane`, in catalog order.
    pub fn column_values(&self, pane: PaneIndex) -> Vec<(SignalId, bool)> {
        self.entries
            .iter()
            .map(|(signal, values)| (signal.clone(), values[pane.index()]))
            .collect()
    }

    /// Control-table rows in catalog order, optionally preceded by the Toggle All row.
    pub fn snapshot(&self, include_toggle_all: bool) -> Vec<SignalRow> {
        let mut rows = Vec::with_capacity(self.entries.len() + 1);
        if include_toggle_all {
            let summary = PaneIndex::ALL.map(|pane| self.column_all_visible(pane));
            rows.push(SignalRow::new(&SignalId::toggle_all(), summary));
        }
        rows.extend(
            self.entries
                .iter()
                .map(|(signal, values)| SignalRow::new(signal, *values)),
        );
        rows
    }

    /// Drops all entries (full application reset).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn ensure_known(&self, signals: &[SignalId]) -> AppResult<()> {
        match signals.iter().find(|s| !self.entries.contains_key(*s)) {
            Some(missing) => Err(unknown(missing)),
            None => Ok(()),
        }
    }
}

fn write(
    values: &mut [bool; PANE_COUNT],
    signal: &SignalId,
    pane: PaneIndex,
    value: bool,
    changes: &mut ChangeSet,
) {
    let slot = &mut values[pane.index()];
    if *slot != value {
        *slot = value;
        changes.push(CellChange {
            signal: signal.clone(),
            pane,
            visible: value,
        });
    }
}

fn unknown(signal: &SignalId) -> PlotError {
    tracing::error!(%signal, "Visibility matrix accessed for a signal outside the catalog");
    PlotError::UnknownSignal(signal.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<SignalId> {
        names.iter().map(|n| SignalId::new("a.csv", *n)).collect()
    }

    fn matrix(names: &[&str]) -> (VisibilityMatrix, Vec<SignalId>) {
        let signals = ids(names);
        let mut matrix = VisibilityMatrix::new();
        matrix.register_signals(&signals);
        (matrix, signals)
    }

    #[test]
    fn test_registration_defaults_true() {
        let (matrix, signals) = matrix(&["X", "Y"]);
        for signal in &signals {
            for pane in PaneIndex::ALL {
                assert!(matrix.get(signal, pane).unwrap());
            }
        }
    }

    #[test]
    fn test_reregistration_is_noop() {
        let (mut matrix, signals) = matrix(&["X"]);
        matrix.set_cell(&signals[0], PaneIndex::ALL[1], false).unwrap();
        matrix.register_signals(&signals);
        assert!(!matrix.get(&signals[0], PaneIndex::ALL[1]).unwrap());
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_set_cell_idempotent() {
        let (mut matrix, signals) = matrix(&["X"]);
        let pane = PaneIndex::ALL[0];
        assert_eq!(matrix.set_cell(&signals[0], pane, false).unwrap().len(), 1);
        assert!(matrix.set_cell(&signals[0], pane, false).unwrap().is_empty());
        assert!(matrix.set_cell(&signals[0], pane, true).unwrap().len() == 1);
        assert!(matrix.set_cell(&signals[0], pane, true).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_signal() {
        let (mut matrix, _) = matrix(&["X"]);
        let ghost = SignalId::new("a.csv", "Ghost");
        assert!(matches!(
            matrix.get(&ghost, PaneIndex::ALL[0]),
            Err(PlotError::UnknownSignal(_))
        ));
        assert!(matrix.set_row(&ghost, false).is_err());
    }

    #[test]
    fn test_set_row_reports_only_changed_panes() {
        let (mut matrix, signals) = matrix(&["X"]);
        matrix.set_cell(&signals[0], PaneIndex::ALL[3], false).unwrap();
        let changes = matrix.set_row(&signals[0], false).unwrap();
        let panes: Vec<_> = changes.iter().map(|c| c.pane.index()).collect();
        assert_eq!(panes, vec![0, 1, 2]);
    }

    #[test]
    fn test_set_column_all() {
        let (mut matrix, _) = matrix(&["X", "Y", "Z"]);
        let pane = PaneIndex::ALL[1];
        let changes = matrix.set_column(pane, false, ColumnScope::All).unwrap();
        assert_eq!(changes.len(), 3);
        for row in matrix.snapshot(false) {
            assert!(!row.plot2);
            assert!(row.plot1 && row.plot3 && row.plot4);
        }
    }

    #[test]
    fn test_set_column_selected_is_atomic() {
        let (mut matrix, signals) = matrix(&["X", "Y"]);
        let pane = PaneIndex::ALL[0];
        let selection = vec![signals[0].clone(), SignalId::new("a.csv", "Ghost")];
        let result = matrix.set_column(pane, false, ColumnScope::Selected(&selection));
        assert!(matches!(result, Err(PlotError::UnknownSignal(_))));
        // Nothing was written for the valid signal either.
        assert!(matrix.get(&signals[0], pane).unwrap());

        let selection = vec![signals[1].clone()];
        let changes = matrix
            .set_column(pane, false, ColumnScope::Selected(&selection))
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matrix.get(&signals[0], pane).unwrap());
        assert!(!matrix.get(&signals[1], pane).unwrap());
    }

    #[test]
    fn test_set_rows_selected() {
        let (mut matrix, signals) = matrix(&["X", "Y"]);
        let changes = matrix.set_rows(&signals[1..], false).unwrap();
        assert_eq!(changes.len(), PANE_COUNT);
        assert!(changes.iter().all(|c| c.signal == signals[1]));
    }

    #[test]
    fn test_set_all() {
        let (mut matrix, _) = matrix(&["X", "Y"]);
        assert_eq!(matrix.set_all(false).len(), 2 * PANE_COUNT);
        assert!(matrix.set_all(false).is_empty());
    }

    #[test]
    fn test_snapshot_order_and_toggle_all_row() {
        let (mut matrix, signals) = matrix(&["X", "Y"]);
        matrix.set_cell(&signals[1], PaneIndex::ALL[2], false).unwrap();

        let rows = matrix.snapshot(true);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_toggle_all());
        assert!(rows[0].plot1 && rows[0].plot2 && !rows[0].plot3 && rows[0].plot4);
        assert_eq!(rows[1].signal_name, "X");
        assert_eq!(rows[2].signal_name, "Y");
        assert!(!rows[2].plot3);

        let rows = matrix.snapshot(false);
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_toggle_all());
    }

    #[test]
    fn test_snapshot_serializes_with_table_keys() {
        let (matrix, _) = matrix(&["X"]);
        let json = serde_json::to_value(matrix.snapshot(false)).unwrap();
        assert_eq!(json[0]["csv_filename"], "a.csv");
        assert_eq!(json[0]["signal_name"], "X");
        assert_eq!(json[0]["plot4"], true);
    }
}
