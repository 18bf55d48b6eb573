//! Pane render adapters.
//!
//! A session drives exactly four chart panes. Each pane is wrapped in a
//! [`PaneRenderAdapter`] that pushes visibility and zoom changes into an external
//! [`ChartPane`] implementation.
//!
//! ## Readiness
//!
//! A pane starts out [`PaneState::NotReady`]: no chart has been attached yet. Pushes to
//! a not-ready pane are skipped (and logged) rather than attempted and swallowed. When a
//! chart is attached the session replays the pane's full current state, so a late chart
//! never starts out stale.
//!
//! ## Async Integration Pattern
//!
//! Render calls are fire-and-forget. [`ChannelPane`] is the stock implementation: it
//! forwards each call as a [`RenderCommand`] over an unbounded channel to whatever task
//! owns the real chart, so the session never waits on rendering.

use crate::catalog::SignalId;
use crate::error::{AppResult, PlotError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Number of chart panes in a session.
pub const PANE_COUNT: usize = 4;

/// Index of one of the four panes (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PaneIndex(u8);

impl PaneIndex {
    /// All panes in index order.
    pub const ALL: [PaneIndex; PANE_COUNT] =
        [PaneIndex(0), PaneIndex(1), PaneIndex(2), PaneIndex(3)];

    pub fn new(index: usize) -> AppResult<Self> {
        if index < PANE_COUNT {
            Ok(Self(index as u8))
        } else {
            Err(PlotError::InvalidPane(index))
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Control-table column key for this pane (`plot1`..`plot4`).
    pub fn column_key(self) -> String {
        format!("plot{}", self.0 + 1)
    }
}

impl TryFrom<usize> for PaneIndex {
    type Error = PlotError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaneIndex> for usize {
    fn from(value: PaneIndex) -> Self {
        value.index()
    }
}

impl fmt::Display for PaneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plot {}", self.0 + 1)
    }
}

/// Explicit x-axis range of a pane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub start: f64,
    pub end: f64,
}

impl ZoomRange {
    /// Both bounds must be finite.
    pub fn new(start: f64, end: f64) -> AppResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(PlotError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }
}

/// Interface of the external chart component for a single pane.
///
/// Implementations must not block: the session calls these from its event loop.
pub trait ChartPane: Send + Sync {
    /// Show or hide the trace of `signal`.
    fn set_trace_visibility(&self, pane: PaneIndex, signal: &SignalId, visible: bool);

    /// Apply an explicit x-axis range, or reset to autoscale with `None`.
    fn set_zoom_range(&self, pane: PaneIndex, range: Option<ZoomRange>);
}

/// Render call forwarded by [`ChannelPane`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    TraceVisibility {
        pane: PaneIndex,
        signal: SignalId,
        visible: bool,
    },
    ZoomRange {
        pane: PaneIndex,
        range: Option<ZoomRange>,
    },
}

impl RenderCommand {
    pub fn pane(&self) -> PaneIndex {
        match self {
            RenderCommand::TraceVisibility { pane, .. } | RenderCommand::ZoomRange { pane, .. } => {
                *pane
            }
        }
    }
}

/// Sender handle for render commands.
pub type RenderSender = mpsc::UnboundedSender<RenderCommand>;

/// Receiver handle held by the task that owns the real chart.
pub type RenderReceiver = mpsc::UnboundedReceiver<RenderCommand>;

/// Create a new channel pair for render commands.
pub fn render_channel() -> (RenderSender, RenderReceiver) {
    mpsc::unbounded_channel()
}

/// [`ChartPane`] that forwards every call over a channel.
#[derive(Debug, Clone)]
pub struct ChannelPane {
    tx: RenderSender,
}

impl ChannelPane {
    pub fn new(tx: RenderSender) -> Self {
        Self { tx }
    }
}

impl ChartPane for ChannelPane {
    fn set_trace_visibility(&self, pane: PaneIndex, signal: &SignalId, visible: bool) {
        if self
            .tx
            .send(RenderCommand::TraceVisibility {
                pane,
                signal: signal.clone(),
                visible,
            })
            .is_err()
        {
            tracing::warn!(%pane, "Render receiver dropped");
        }
    }

    fn set_zoom_range(&self, pane: PaneIndex, range: Option<ZoomRange>) {
        if self.tx.send(RenderCommand::ZoomRange { pane, range }).is_err() {
            tracing::warn!(%pane, "Render receiver dropped");
        }
    }
}

/// Readiness of a pane's chart.
#[derive(Clone, Default)]
pub enum PaneState {
    /// No chart attached yet; pushes are skipped.
    #[default]
    NotReady,
    Ready(Arc<dyn ChartPane>),
}

impl fmt::Debug for PaneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneState::NotReady => write!(f, "NotReady"),
            PaneState::Ready(_) => write!(f, "Ready(<chart>)"),
        }
    }
}

/// Engine-side wrapper around one pane's chart.
#[derive(Debug)]
pub struct PaneRenderAdapter {
    index: PaneIndex,
    state: PaneState,
    zoom: Option<ZoomRange>,
}

impl PaneRenderAdapter {
    pub fn new(index: PaneIndex) -> Self {
        Self {
            index,
            state: PaneState::NotReady,
            zoom: None,
        }
    }

    pub fn index(&self) -> PaneIndex {
        self.index
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, PaneState::Ready(_))
    }

    pub fn attach(&mut self, chart: Arc<dyn ChartPane>) {
        tracing::info!(pane = %self.index, "Chart attached");
        self.state = PaneState::Ready(chart);
    }

    pub fn detach(&mut self) {
        tracing::info!(pane = %self.index, "Chart detached");
        self.state = PaneState::NotReady;
    }

    /// Last explicit range known for this pane (`None` = autoscale).
    pub fn zoom(&self) -> Option<ZoomRange> {
        self.zoom
    }

    /// Push a trace visibility change. Returns whether the push reached a chart.
    pub fn push_visibility(&self, signal: &SignalId, visible: bool) -> bool {
        match &self.state {
            PaneState::Ready(chart) => {
                chart.set_trace_visibility(self.index, signal, visible);
                true
            }
            PaneState::NotReady => {
                tracing::debug!(
                    pane = %self.index,
                    %signal,
                    "Pane not ready, visibility push skipped"
                );
                false
            }
        }
    }

    /// Apply a range coming from a sibling pane and push it to the chart.
    pub fn apply_zoom(&mut self, range: Option<ZoomRange>) -> bool {
        self.zoom = range;
        match &self.state {
            PaneState::Ready(chart) => {
                chart.set_zoom_range(self.index, range);
                true
            }
            PaneState::NotReady => {
                tracing::debug!(pane = %self.index, "Pane not ready, zoom push skipped");
                false
            }
        }
    }

    /// Record a range the chart reached on its own (user zoom); nothing is pushed back.
    pub fn record_zoom(&mut self, range: Option<ZoomRange>) {
        self.zoom = range;
    }
}

/// The fixed array of four pane adapters, addressed by [`PaneIndex`].
#[derive(Debug)]
pub struct PaneSet {
    panes: [PaneRenderAdapter; PANE_COUNT],
}

impl Default for PaneSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PaneSet {
    pub fn new() -> Self {
        Self {
            panes: PaneIndex::ALL.map(PaneRenderAdapter::new),
        }
    }

    pub fn get(&self, pane: PaneIndex) -> &PaneRenderAdapter {
        &self.panes[pane.index()]
    }

    pub fn get_mut(&mut self, pane: PaneIndex) -> &mut PaneRenderAdapter {
        &mut self.panes[pane.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaneRenderAdapter> {
        self.panes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pane_index_bounds() {
        assert_eq!(PaneIndex::new(3).unwrap().index(), 3);
        assert!(matches!(PaneIndex::new(4), Err(PlotError::InvalidPane(4))));
        assert_eq!(PaneIndex::ALL[1].column_key(), "plot2");
        assert_eq!(PaneIndex::ALL[1].to_string(), "Plot 2");
    }

    #[test]
    fn test_zoom_range_must_be_finite() {
        assert!(ZoomRange::new(10.0, 20.0).is_ok());
        assert!(ZoomRange::new(f64::NAN, 20.0).is_err());
        assert!(ZoomRange::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_not_ready_pane_skips_pushes() {
        let mut adapter = PaneRenderAdapter::new(PaneIndex::ALL[0]);
        assert!(!adapter.push_visibility(&SignalId::new("a.csv", "X"), false));
        assert!(!adapter.apply_zoom(ZoomRange::new(1.0, 2.0).ok()));
        // Range is still tracked so it can be replayed on attach.
        assert_eq!(adapter.zoom(), ZoomRange::new(1.0, 2.0).ok());
    }

    #[test]
    fn test_channel_pane_forwards_commands() {
        let (tx, mut rx) = render_channel();
        let mut adapter = PaneRenderAdapter::new(PaneIndex::ALL[2]);
        adapter.attach(Arc::new(ChannelPane::new(tx)));

        let signal = SignalId::new("a.csv", "X");
        assert!(adapter.push_visibility(&signal, false));
        assert!(adapter.apply_zoom(None));

        assert_eq!(
            rx.try_recv().unwrap(),
            RenderCommand::TraceVisibility {
                pane: PaneIndex::ALL[2],
                signal,
                visible: false
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            RenderCommand::ZoomRange {
                pane: PaneIndex::ALL[2],
                range: None
            }
        );
    }

    #[test]
    fn test_detach_returns_to_not_ready() {
        let (tx, _rx) = render_channel();
        let mut adapter = PaneRenderAdapter::new(PaneIndex::ALL[1]);
        adapter.attach(Arc::new(ChannelPane::new(tx)));
        assert!(adapter.is_ready());
        adapter.detach();
        assert!(!adapter.is_ready());
    }
}
