//! Plotting session actor.
//!
//! A [`PlotSession`] is the single owner of one user's state: the signal catalog,
//! the visibility matrix, the mutation scheduler, the zoom sync coordinator and
//! the four pane adapters. It runs in its own Tokio task and processes
//! [`SessionCommand`]s strictly one at a time, so none of that state needs a lock.
//! Two sessions never share any of it.
//!
//! ## Event loop
//!
//! ```text
//! SessionHandle ──SessionCommand──> PlotSession::run ──ChartPane──> charts
//!                                     │  select! {
//!                                     │    command_rx.recv(),
//!                                     │    sleep_until(flush deadline),
//!                                     │  }
//!                                     └──SessionEvent──> control table / caller
//! ```
//!
//! Mutations update the matrix immediately and re-arm the scheduler's deadline.
//! The loop only sleeps on that deadline while one is armed; when it fires, a single
//! flush pushes the net deltas to the panes and emits one table refresh, both built
//! from the matrix as it stands at that moment. Since the flush runs inside the loop,
//! a command arriving meanwhile waits for it to finish and then starts a fresh timer.
//!
//! ## Shutdown
//!
//! [`SessionCommand::Shutdown`] (or dropping every handle) flushes any pending batch
//! and ends the loop.

use crate::bridge::{BulkTarget, ControlTableBridge, PaneTarget, SelectionSource, TableModel};
use crate::catalog::{Signal, SignalCatalog, SignalId};
use crate::commands::{event_channel, EventReceiver, EventSender, SessionCommand, SessionEvent};
use crate::config::AppConfig;
use crate::error::{AppResult, PlotError};
use crate::ingest::{IngestOutcome, RawTable};
use crate::layout::LayoutMode;
use crate::matrix::{CellChange, ChangeSet, VisibilityMatrix};
use crate::pane::{ChartPane, PaneIndex, PaneSet};
use crate::scheduler::MutationScheduler;
use crate::sync::{SyncCoordinator, ZoomEvent};
use indexmap::IndexSet;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// State owner for one user session.
pub struct PlotSession {
    id: Uuid,
    config: AppConfig,
    catalog: SignalCatalog,
    matrix: VisibilityMatrix,
    scheduler: MutationScheduler,
    sync: SyncCoordinator,
    panes: PaneSet,
    bridge: ControlTableBridge,
    layout: LayoutMode,
    selection: Arc<dyn SelectionSource>,
    events: EventSender,
    /// Signals dropped by a reset whose visibility the charts may still hold.
    stale_after_reset: IndexSet<SignalId>,
}

impl PlotSession {
    /// Creates the actor without starting it. See [`spawn`](Self::spawn).
    pub fn new(
        id: Uuid,
        config: AppConfig,
        selection: Arc<dyn SelectionSource>,
        events: EventSender,
    ) -> Self {
        Self {
            id,
            scheduler: MutationScheduler::new(config.scheduler.quiet_period()),
            bridge: ControlTableBridge::new(config.table.show_toggle_all_row),
            layout: config.layout.default,
            config,
            catalog: SignalCatalog::new(),
            matrix: VisibilityMatrix::new(),
            sync: SyncCoordinator::new(),
            panes: PaneSet::new(),
            selection,
            events,
            stale_after_reset: IndexSet::new(),
        }
    }

    /// Spawns a new session task and returns its handle, event stream and task.
    pub fn spawn(
        config: AppConfig,
        selection: Arc<dyn SelectionSource>,
    ) -> (SessionHandle, EventReceiver, JoinHandle<()>) {
        let id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(config.scheduler.command_capacity);
        let (event_tx, event_rx) = event_channel();

        let session = PlotSession::new(id, config, selection, event_tx);
        let span = tracing::info_span!("session", %id);
        let task = tokio::spawn(session.run(command_rx).instrument(span));

        (SessionHandle { id, command_tx }, event_rx, task)
    }

    /// Runs the event loop until shutdown or until every handle is dropped.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<SessionCommand>) {
        info!(layout = %self.layout, "Session started");

        loop {
            let deadline = self.scheduler.deadline();
            let flush_at = deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(SessionCommand::Shutdown { response }) => {
                        info!("Shutdown command received");
                        self.flush_pending();
                        let _ = response.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("Command channel closed, shutting down session");
                        self.flush_pending();
                        break;
                    }
                },

                () = time::sleep_until(flush_at), if deadline.is_some() => {
                    self.flush();
                }
            }
        }

        info!(flushes = self.scheduler.flush_count(), "Session stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!(?command, "Handling command");
        match command {
            SessionCommand::IngestFile {
                source_file,
                table,
                response,
            } => {
                let result = self.ingest_file(&source_file, table);
                let _ = response.send(result);
            }
            SessionCommand::EditCell {
                row,
                column_key,
                value,
                response,
            } => {
                let result = self
                    .bridge
                    .on_cell_edited(&mut self.matrix, &row, &column_key, value);
                let _ = response.send(self.apply_mutation(result));
            }
            SessionCommand::BulkAction {
                target,
                pane,
                value,
                response,
            } => {
                let result = self.bulk_action(target, pane, value);
                let _ = response.send(result);
            }
            SessionCommand::SetSync {
                pane,
                enabled,
                response,
            } => {
                self.sync.set_sync(pane, enabled);
                let _ = response.send(());
            }
            SessionCommand::ZoomChanged {
                pane,
                event,
                response,
            } => {
                let updated = self.zoom_changed(pane, event);
                let _ = response.send(updated);
            }
            SessionCommand::AttachPane {
                pane,
                chart,
                response,
            } => {
                self.attach_pane(pane, chart);
                let _ = response.send(());
            }
            SessionCommand::DetachPane { pane, response } => {
                self.panes.get_mut(pane).detach();
                let _ = response.send(());
            }
            SessionCommand::SetLayout { mode, response } => {
                self.set_layout(mode);
                let _ = response.send(());
            }
            SessionCommand::Snapshot { response } => {
                let _ = response.send(self.table_model());
            }
            SessionCommand::FlushNow { response } => {
                let _ = response.send(self.flush_pending());
            }
            SessionCommand::Reset { response } => {
                self.reset();
                let _ = response.send(());
            }
            SessionCommand::Shutdown { response } => {
                // Intercepted by the event loop; kept for exhaustiveness.
                let _ = response.send(());
            }
        }
    }

    /// Ingestion pipeline: validate, register in the catalog, create matrix entries.
    fn ingest_file(&mut self, source_file: &str, table: RawTable) -> AppResult<IngestOutcome> {
        let ingested = table.into_columns(source_file, &self.config.ingestion.time_column)?;

        match self
            .catalog
            .register_file(source_file, ingested.time_axis, ingested.columns)
        {
            Ok(added) => {
                // Entries exist before the table or any pane sees the new signals.
                self.matrix.register_signals(added.iter().map(Signal::id));

                // Charts may still show a pre-reset state for a returning signal.
                let resync: ChangeSet = added
                    .iter()
                    .filter(|signal| self.stale_after_reset.shift_remove(signal.id()))
                    .flat_map(|signal| {
                        PaneIndex::ALL.map(|pane| CellChange {
                            signal: signal.id().clone(),
                            pane,
                            visible: true,
                        })
                    })
                    .collect();
                if !resync.is_empty() {
                    debug!(
                        changes = resync.len(),
                        "Resyncing signals registered again after reset"
                    );
                }
                self.scheduler.record_resync(resync, Instant::now());
                Ok(IngestOutcome {
                    added_signals: added.iter().map(|s| s.name().to_string()).collect(),
                    rejected: false,
                    warning: None,
                })
            }
            Err(err) if err.is_user_warning() => {
                let message = err.to_string();
                self.warn(&message);
                Ok(IngestOutcome::rejected(message))
            }
            Err(err) => Err(err),
        }
    }

    fn bulk_action(&mut self, target: BulkTarget, pane: PaneTarget, value: bool) -> AppResult<()> {
        let result = self.bridge.on_bulk_action(
            &mut self.matrix,
            target,
            pane,
            value,
            self.selection.as_ref(),
        );
        self.apply_mutation(result)
    }

    /// Hands a mutation result to the scheduler, or reports why it failed.
    fn apply_mutation(&mut self, result: AppResult<ChangeSet>) -> AppResult<()> {
        match result {
            Ok(changes) => {
                debug!(changes = changes.len(), "Mutation applied");
                self.scheduler.record(changes, Instant::now());
                Ok(())
            }
            Err(err) => {
                if err.is_user_warning() {
                    self.warn(&err.to_string());
                } else if !matches!(err, PlotError::UnknownSignal(_)) {
                    warn!(error = %err, "Mutation rejected");
                }
                Err(err)
            }
        }
    }

    fn zoom_changed(&mut self, trigger: PaneIndex, event: ZoomEvent) -> Vec<PaneIndex> {
        // The trigger's chart already shows the new range; only remember it.
        self.panes.get_mut(trigger).record_zoom(event.range());

        self.sync
            .on_zoom_change(trigger, event)
            .into_iter()
            .map(|update| {
                self.panes.get_mut(update.pane).apply_zoom(update.range);
                update.pane
            })
            .collect()
    }

    /// Attaches a chart and replays the pane's full state to it.
    fn attach_pane(&mut self, pane: PaneIndex, chart: Arc<dyn ChartPane>) {
        let adapter = self.panes.get_mut(pane);
        adapter.attach(chart);
        for (signal, visible) in self.matrix.column_values(pane) {
            adapter.push_visibility(&signal, visible);
        }
        if let Some(range) = adapter.zoom() {
            adapter.apply_zoom(Some(range));
        }
    }

    fn set_layout(&mut self, mode: LayoutMode) {
        info!(from = %self.layout, to = %mode, "Layout changed");
        self.layout = mode;
        self.emit(SessionEvent::LayoutChanged {
            mode,
            visible_panes: mode.visible_panes().to_vec(),
        });
    }

    fn reset(&mut self) {
        info!(signals = self.catalog.len(), "Session reset");
        self.stale_after_reset
            .extend(self.catalog.all_signals().map(|signal| signal.id().clone()));
        self.catalog.reset();
        self.matrix.clear();
        self.scheduler.clear();
        // The table still has to be redrawn empty.
        self.scheduler.record(ChangeSet::new(), Instant::now());
    }

    fn table_model(&self) -> TableModel {
        self.bridge.table_model(&self.catalog, &self.matrix)
    }

    /// Flushes only if a batch is pending. Returns the number of deltas pushed.
    fn flush_pending(&mut self) -> usize {
        if self.scheduler.has_pending() {
            self.flush()
        } else {
            0
        }
    }

    /// One render pass: push net deltas to every pane, then refresh the table once.
    fn flush(&mut self) -> usize {
        let batch = self.scheduler.take_batch();
        let mut skipped = 0;
        for change in &batch.deltas {
            if !self
                .panes
                .get(change.pane)
                .push_visibility(&change.signal, change.visible)
            {
                skipped += 1;
            }
        }
        debug!(
            sequence = batch.sequence,
            changes = batch.deltas.len(),
            skipped,
            "Flushed visibility batch"
        );

        let count = batch.deltas.len();
        self.emit(SessionEvent::TableRefreshed {
            model: self.table_model(),
        });
        self.emit(SessionEvent::Flushed {
            sequence: batch.sequence,
            deltas: batch.deltas,
        });
        count
    }

    fn warn(&self, message: &str) {
        warn!(warning = message, "User warning");
        self.emit(SessionEvent::Warning {
            message: message.to_string(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

/// Cloneable handle used to talk to a running [`PlotSession`].
///
/// Every method fails with [`PlotError::SessionClosed`] once the session task has
/// stopped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    command_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the session task is still accepting commands.
    pub fn is_open(&self) -> bool {
        !self.command_tx.is_closed()
    }

    async fn request<T>(
        &self,
        command: SessionCommand,
        response: oneshot::Receiver<T>,
    ) -> AppResult<T> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| PlotError::SessionClosed)?;
        response.await.map_err(|_| PlotError::SessionClosed)
    }

    pub async fn ingest_file(
        &self,
        source_file: impl Into<String>,
        table: RawTable,
    ) -> AppResult<IngestOutcome> {
        let (cmd, rx) = SessionCommand::ingest_file(source_file.into(), table);
        self.request(cmd, rx).await?
    }

    pub async fn edit_cell(&self, row: SignalId, column_key: &str, value: bool) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::edit_cell(row, column_key.to_string(), value);
        self.request(cmd, rx).await?
    }

    /// Cell edit addressed by pane rather than column key.
    pub async fn set_cell(&self, row: SignalId, pane: PaneIndex, value: bool) -> AppResult<()> {
        self.edit_cell(row, &pane.column_key(), value).await
    }

    pub async fn bulk_action(
        &self,
        target: BulkTarget,
        pane: PaneTarget,
        value: bool,
    ) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::bulk_action(target, pane, value);
        self.request(cmd, rx).await?
    }

    pub async fn set_sync(&self, pane: PaneIndex, enabled: bool) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::set_sync(pane, enabled);
        self.request(cmd, rx).await
    }

    /// Reports a zoom on `pane`; returns the sibling panes that were updated.
    pub async fn zoom_changed(
        &self,
        pane: PaneIndex,
        event: ZoomEvent,
    ) -> AppResult<Vec<PaneIndex>> {
        let (cmd, rx) = SessionCommand::zoom_changed(pane, event);
        self.request(cmd, rx).await
    }

    /// Reports a raw chart relayout payload; payloads without an x-axis change are ignored.
    pub async fn relayout(&self, pane: PaneIndex, payload: &Value) -> AppResult<Vec<PaneIndex>> {
        match ZoomEvent::from_relayout(payload)? {
            Some(event) => self.zoom_changed(pane, event).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn attach_pane(&self, pane: PaneIndex, chart: Arc<dyn ChartPane>) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::attach_pane(pane, chart);
        self.request(cmd, rx).await
    }

    pub async fn detach_pane(&self, pane: PaneIndex) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::detach_pane(pane);
        self.request(cmd, rx).await
    }

    pub async fn set_layout(&self, mode: LayoutMode) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::set_layout(mode);
        self.request(cmd, rx).await
    }

    pub async fn snapshot(&self) -> AppResult<TableModel> {
        let (cmd, rx) = SessionCommand::snapshot();
        self.request(cmd, rx).await
    }

    /// Flushes pending mutations now; returns the number of deltas pushed.
    pub async fn flush_now(&self) -> AppResult<usize> {
        let (cmd, rx) = SessionCommand::flush_now();
        self.request(cmd, rx).await
    }

    pub async fn reset(&self) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::reset();
        self.request(cmd, rx).await
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        let (cmd, rx) = SessionCommand::shutdown();
        self.request(cmd, rx).await
    }
}
