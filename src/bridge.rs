//! Control-table bridge.
//!
//! Translates events coming from the spreadsheet-like control table into
//! visibility-matrix mutations, and rebuilds the table's row data from the matrix.
//!
//! The table widget itself (cell editing, multi-row selection) lives outside this
//! crate. It reports edits as `(row_key, column_key, value)` and exposes its current
//! selection through [`SelectionSource`].
//!
//! ## Event mapping
//!
//! | Table event | Matrix mutation |
//! |---|---|
//! | cell edit on a signal row | `set_cell` |
//! | cell edit on the "Toggle All" row | `set_column(pane, value, All)` |
//! | bulk, all signals, one pane | `set_column(pane, value, All)` |
//! | bulk, all signals, all panes | `set_all` |
//! | bulk, selected signals, one pane | `set_column(pane, value, Selected)` |
//! | bulk, selected signals, all panes | `set_rows(selected, value)` |

use crate::catalog::{SignalCatalog, SignalId};
use crate::error::{AppResult, PlotError};
use crate::matrix::{ChangeSet, ColumnScope, SignalRow, VisibilityMatrix};
use crate::pane::PaneIndex;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which signals a bulk action touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkTarget {
    AllSignals,
    SelectedSignals,
}

/// Which panes a bulk action touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaneTarget {
    Pane(PaneIndex),
    AllPanes,
}

/// Current multi-row selection of the control table.
pub trait SelectionSource: Send + Sync {
    fn selected_row_keys(&self) -> Vec<SignalId>;
}

/// Selection shared between the table widget and the session.
///
/// The widget writes it whenever the user changes the selection; the session reads
/// it on demand when a "selected rows" action runs.
#[derive(Debug, Clone, Default)]
pub struct SharedSelection(Arc<RwLock<Vec<SignalId>>>);

impl SharedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, keys: Vec<SignalId>) {
        *self.0.write() = keys;
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }
}

impl SelectionSource for SharedSelection {
    fn selected_row_keys(&self) -> Vec<SignalId> {
        self.0.read().clone()
    }
}

/// Column definition handed to the table widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub header_name: String,
    pub field: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub editable: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cell_editor: Option<String>,
}

/// Everything the table needs to redraw: headers and rows from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableModel {
    pub column_defs: Vec<ColumnDef>,
    pub row_data: Vec<SignalRow>,
}

/// Maps a table column key (`plot1`..`plot4`) to its pane.
pub fn parse_column_key(key: &str) -> AppResult<PaneIndex> {
    key.strip_prefix("plot")
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| PaneIndex::new(i).ok())
        .ok_or_else(|| PlotError::InvalidColumnKey(key.to_string()))
}

/// Column definitions; the file column header shows how many files were processed.
pub fn column_defs(source_count: usize) -> Vec<ColumnDef> {
    let mut defs = vec![
        ColumnDef {
            header_name: format!("CSV File name | Total files: {source_count}"),
            field: "csv_filename".into(),
            editable: false,
            cell_editor: None,
        },
        ColumnDef {
            header_name: "Signal Name".into(),
            field: "signal_name".into(),
            editable: false,
            cell_editor: None,
        },
    ];
    defs.extend(PaneIndex::ALL.map(|pane| ColumnDef {
        header_name: pane.to_string(),
        field: pane.column_key(),
        editable: true,
        cell_editor: Some("agCheckboxCellEditor".into()),
    }));
    defs
}

#[derive(Debug, Clone)]
pub struct ControlTableBridge {
    include_toggle_all: bool,
}

impl ControlTableBridge {
    pub fn new(include_toggle_all: bool) -> Self {
        Self { include_toggle_all }
    }

    /// A single checkbox edit.
    pub fn on_cell_edit(
        &self,
        matrix: &mut VisibilityMatrix,
        row: &SignalId,
        pane: PaneIndex,
        value: bool,
    ) -> AppResult<ChangeSet> {
        if row.is_toggle_all() {
            tracing::debug!(%pane, value, "Toggle All row edited");
            return matrix.set_column(pane, value, ColumnScope::All);
        }
        matrix.set_cell(row, pane, value)
    }

    /// A cell edit as reported by the widget, addressed by column key.
    pub fn on_cell_edited(
        &self,
        matrix: &mut VisibilityMatrix,
        row: &SignalId,
        column_key: &str,
        value: bool,
    ) -> AppResult<ChangeSet> {
        let pane = parse_column_key(column_key)?;
        self.on_cell_edit(matrix, row, pane, value)
    }

    /// A button-driven bulk action.
    pub fn on_bulk_action(
        &self,
        matrix: &mut VisibilityMatrix,
        target: BulkTarget,
        pane: PaneTarget,
        value: bool,
        selection: &dyn SelectionSource,
    ) -> AppResult<ChangeSet> {
        match target {
            BulkTarget::AllSignals => match pane {
                PaneTarget::Pane(pane) => matrix.set_column(pane, value, ColumnScope::All),
                PaneTarget::AllPanes => Ok(matrix.set_all(value)),
            },
            BulkTarget::SelectedSignals => {
                // Keys can outlive their rows, e.g. a selection made before a reset.
                let selected: Vec<SignalId> = selection
                    .selected_row_keys()
                    .into_iter()
                    .filter(|key| !key.is_toggle_all())
                    .filter(|key| {
                        let known = matrix.contains(key);
                        if !known {
                            tracing::debug!(signal = %key, "Ignoring stale selected row");
                        }
                        known
                    })
                    .collect();
                if selected.is_empty() {
                    return Err(PlotError::EmptySelection);
                }
                match pane {
                    PaneTarget::Pane(pane) => {
                        matrix.set_column(pane, value, ColumnScope::Selected(&selected))
                    }
                    PaneTarget::AllPanes => matrix.set_rows(&selected, value),
                }
            }
        }
    }

    /// Rebuilds the table from the current catalog and matrix.
    pub fn table_model(&self, catalog: &SignalCatalog, matrix: &VisibilityMatrix) -> TableModel {
        TableModel {
            column_defs: column_defs(catalog.source_count()),
            row_data: matrix.snapshot(self.include_toggle_all),
        }
    }
}
