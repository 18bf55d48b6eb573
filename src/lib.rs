//! # Signal Panes Core Library
//!
//! This crate is the engine behind a multi-pane signal viewer: users upload delimited
//! time-series files and look at the combined signals across up to four chart panes,
//! with per-signal, per-pane visibility, optional zoom synchronization between panes,
//! and a spreadsheet-like control table for editing visibility one cell at a time or
//! in bulk. Parsing beyond the simple delimited reader, the chart renderer and the
//! table widget are external collaborators reached through small interfaces.
//!
//! ## Crate Structure
//!
//! - **`catalog`**: `SignalCatalog`, the ordered set of plottable signals per session,
//!   and the column filter that keeps time-axis columns out of it.
//! - **`matrix`**: `VisibilityMatrix`, the single source of truth for which signal is
//!   shown in which pane, with atomic cell/row/column/global mutations.
//! - **`scheduler`**: `MutationScheduler`, which coalesces bursts of edits into one
//!   debounced flush with last-write-wins deltas.
//! - **`sync`**: `SyncCoordinator`, which propagates zoom ranges between synced panes.
//! - **`pane`**: `PaneIndex`, the `ChartPane` render interface and the per-pane adapters
//!   with explicit readiness.
//! - **`bridge`**: `ControlTableBridge`, translating table edits and bulk actions into
//!   matrix mutations and producing the table model.
//! - **`layout`**: on-screen layout modes (1x1, 1x2, 2x1, 2x2).
//! - **`ingest`**: the ingestion boundary (delimited reader, time column validation).
//! - **`commands`**: `SessionCommand` and `SessionEvent`, the actor message protocol.
//! - **`session`**: `PlotSession`, the per-user actor, and its `SessionHandle`.
//! - **`registry`**: `SessionRegistry`, one isolated session per client.
//! - **`config`**: figment-based configuration (`AppConfig`).
//! - **`logging`**: `tracing-subscriber` initialization.
//! - **`error`**: the `PlotError` enum shared by all of the above.

pub mod bridge;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod logging;
pub mod matrix;
pub mod pane;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod sync;

pub use error::{AppResult, PlotError};
pub use session::{PlotSession, SessionHandle};
