//! Message types for session actor communication.
//!
//! Every interaction with a plotting session goes through a [`SessionCommand`] sent
//! over an mpsc channel to the [`PlotSession`](crate::session::PlotSession) actor.
//! Commands carry a oneshot sender for their response, and each variant has a helper
//! constructor that returns the receiver alongside the command:
//!
//! ```rust
//! use signal_panes::commands::SessionCommand;
//!
//! let (cmd, rx) = SessionCommand::snapshot();
//! // cmd_tx.send(cmd).await?;
//! // let model = rx.await?;
//! ```
//!
//! Output the session produces on its own (debounced table refreshes, warnings)
//! travels the other way as [`SessionEvent`]s on an unbounded channel.

use crate::bridge::{BulkTarget, PaneTarget, TableModel};
use crate::catalog::SignalId;
use crate::error::AppResult;
use crate::ingest::{IngestOutcome, RawTable};
use crate::layout::LayoutMode;
use crate::matrix::CellChange;
use crate::pane::{ChartPane, PaneIndex};
use crate::sync::ZoomEvent;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Commands accepted by a session actor.
pub enum SessionCommand {
    /// Ingests one uploaded file.
    ///
    /// # Response
    ///
    /// - `Ok(outcome)` with the added signal names, or a rejected outcome carrying a
    ///   warning when the file name was already processed
    /// - `Err`: the table has no time column
    IngestFile {
        source_file: String,
        table: RawTable,
        response: oneshot::Sender<AppResult<IngestOutcome>>,
    },

    /// A checkbox edit in the control table, addressed by column key (`plot1`..`plot4`).
    EditCell {
        row: SignalId,
        column_key: String,
        value: bool,
        response: oneshot::Sender<AppResult<()>>,
    },

    /// A button-driven bulk visibility action.
    ///
    /// `Err(EmptySelection)` when a selected-rows action runs with nothing selected;
    /// a warning event is emitted as well.
    BulkAction {
        target: BulkTarget,
        pane: PaneTarget,
        value: bool,
        response: oneshot::Sender<AppResult<()>>,
    },

    /// Adds a pane to, or removes it from, the zoom sync group.
    SetSync {
        pane: PaneIndex,
        enabled: bool,
        response: oneshot::Sender<()>,
    },

    /// A pane's chart reported a zoom, pan or reset.
    ///
    /// Responds with the sibling panes that were updated.
    ZoomChanged {
        pane: PaneIndex,
        event: ZoomEvent,
        response: oneshot::Sender<Vec<PaneIndex>>,
    },

    /// Attaches a chart to a pane; the pane's current state is replayed to it.
    AttachPane {
        pane: PaneIndex,
        chart: Arc<dyn ChartPane>,
        response: oneshot::Sender<()>,
    },

    /// Detaches a pane's chart; further pushes to it are skipped.
    DetachPane {
        pane: PaneIndex,
        response: oneshot::Sender<()>,
    },

    /// Switches the on-screen layout.
    SetLayout {
        mode: LayoutMode,
        response: oneshot::Sender<()>,
    },

    /// Current control-table model.
    Snapshot {
        response: oneshot::Sender<TableModel>,
    },

    /// Flushes pending mutations immediately instead of waiting for the quiet period.
    ///
    /// Responds with the number of deltas pushed.
    FlushNow {
        response: oneshot::Sender<usize>,
    },

    /// Full reset: forgets every file, signal and pending mutation.
    Reset {
        response: oneshot::Sender<()>,
    },

    /// Stops the actor. Pending mutations are flushed first.
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

impl fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionCommand::IngestFile { source_file, .. } => {
                write!(f, "IngestFile({source_file})")
            }
            SessionCommand::EditCell {
                row,
                column_key,
                value,
                ..
            } => write!(f, "EditCell({row}, {column_key}, {value})"),
            SessionCommand::BulkAction {
                target,
                pane,
                value,
                ..
            } => write!(f, "BulkAction({target:?}, {pane:?}, {value})"),
            SessionCommand::SetSync { pane, enabled, .. } => {
                write!(f, "SetSync({pane}, {enabled})")
            }
            SessionCommand::ZoomChanged { pane, event, .. } => {
                write!(f, "ZoomChanged({pane}, {event:?})")
            }
            SessionCommand::AttachPane { pane, .. } => write!(f, "AttachPane({pane})"),
            SessionCommand::DetachPane { pane, .. } => write!(f, "DetachPane({pane})"),
            SessionCommand::SetLayout { mode, .. } => write!(f, "SetLayout({mode})"),
            SessionCommand::Snapshot { .. } => write!(f, "Snapshot"),
            SessionCommand::FlushNow { .. } => write!(f, "FlushNow"),
            SessionCommand::Reset { .. } => write!(f, "Reset"),
            SessionCommand::Shutdown { .. } => write!(f, "Shutdown"),
        }
    }
}

impl SessionCommand {
    pub fn ingest_file(
        source_file: String,
        table: RawTable,
    ) -> (Self, oneshot::Receiver<AppResult<IngestOutcome>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::IngestFile {
                source_file,
                table,
                response: tx,
            },
            rx,
        )
    }

    pub fn edit_cell(
        row: SignalId,
        column_key: String,
        value: bool,
    ) -> (Self, oneshot::Receiver<AppResult<()>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::EditCell {
                row,
                column_key,
                value,
                response: tx,
            },
            rx,
        )
    }

    pub fn bulk_action(
        target: BulkTarget,
        pane: PaneTarget,
        value: bool,
    ) -> (Self, oneshot::Receiver<AppResult<()>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::BulkAction {
                target,
                pane,
                value,
                response: tx,
            },
            rx,
        )
    }

    pub fn set_sync(pane: PaneIndex, enabled: bool) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::SetSync {
                pane,
                enabled,
                response: tx,
            },
            rx,
        )
    }

    pub fn zoom_changed(
        pane: PaneIndex,
        event: ZoomEvent,
    ) -> (Self, oneshot::Receiver<Vec<PaneIndex>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::ZoomChanged {
                pane,
                event,
                response: tx,
            },
            rx,
        )
    }

    pub fn attach_pane(
        pane: PaneIndex,
        chart: Arc<dyn ChartPane>,
    ) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::AttachPane {
                pane,
                chart,
                response: tx,
            },
            rx,
        )
    }

    pub fn detach_pane(pane: PaneIndex) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::DetachPane { pane, response: tx }, rx)
    }

    pub fn set_layout(mode: LayoutMode) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::SetLayout { mode, response: tx }, rx)
    }

    pub fn snapshot() -> (Self, oneshot::Receiver<TableModel>) {
        let (tx, rx) = oneshot::channel();
        (Self::Snapshot { response: tx }, rx)
    }

    pub fn flush_now() -> (Self, oneshot::Receiver<usize>) {
        let (tx, rx) = oneshot::channel();
        (Self::FlushNow { response: tx }, rx)
    }

    pub fn reset() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::Reset { response: tx }, rx)
    }

    pub fn shutdown() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::Shutdown { response: tx }, rx)
    }
}

/// Output a session emits without being asked.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The control table must be redrawn from this model (emitted once per flush).
    TableRefreshed { model: TableModel },
    /// A recoverable problem to show the user (duplicate upload, empty selection).
    Warning { message: String },
    /// A debounced batch was pushed to the panes.
    Flushed {
        sequence: u64,
        deltas: Vec<CellChange>,
    },
    /// The layout changed; `visible_panes` are the panes now on screen.
    LayoutChanged {
        mode: LayoutMode,
        visible_panes: Vec<PaneIndex>,
    },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_helper_returns_paired_receiver() {
        let (cmd, rx) = SessionCommand::flush_now();
        match cmd {
            SessionCommand::FlushNow { response } => response.send(3).unwrap(),
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(rx.await.unwrap(), 3);
    }

    #[test]
    fn test_debug_omits_payloads() {
        let (cmd, _rx) = SessionCommand::edit_cell(
            SignalId::new("a.csv", "X"),
            "plot2".to_string(),
            false,
        );
        assert_eq!(format!("{cmd:?}"), "EditCell(a.csv:X, plot2, false)");

        let (cmd, _rx) = SessionCommand::ingest_file("b.csv".into(), RawTable::default());
        assert_eq!(format!("{cmd:?}"), "IngestFile(b.csv)");
    }
}
