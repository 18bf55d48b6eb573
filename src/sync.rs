//! Cross-pane zoom synchronization.
//!
//! Each pane is either synced or unsynced; only an explicit toggle moves it between
//! the two. When a synced pane reports a zoom change, the coordinator computes the
//! updates for every *other* synced pane:
//!
//! - a concrete range is applied verbatim,
//! - a reset (`None`) clears the explicit range so the sibling autoscales.
//!
//! Unsynced panes are never targeted and the triggering pane is never rewritten by
//! its own event. Sibling updates are independent of each other, so their order
//! does not matter.

use crate::error::AppResult;
use crate::pane::{PaneIndex, ZoomRange, PANE_COUNT};
use serde_json::Value;

/// A user-driven zoom/pan/reset on one pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomEvent {
    Range(ZoomRange),
    Reset,
}

impl ZoomEvent {
    /// Decode a chart relayout payload.
    ///
    /// `xaxis.range[0]` + `xaxis.range[1]` give a range, `xaxis.autorange` a reset.
    /// Payloads touching neither (e.g. a y-axis only relayout) yield `Ok(None)`.
    pub fn from_relayout(payload: &Value) -> AppResult<Option<Self>> {
        let start = payload.get("xaxis.range[0]").and_then(Value::as_f64);
        let end = payload.get("xaxis.range[1]").and_then(Value::as_f64);
        if let (Some(start), Some(end)) = (start, end) {
            return Ok(Some(ZoomEvent::Range(ZoomRange::new(start, end)?)));
        }
        if payload.get("xaxis.autorange").is_some() {
            return Ok(Some(ZoomEvent::Reset));
        }
        Ok(None)
    }

    pub fn range(self) -> Option<ZoomRange> {
        match self {
            ZoomEvent::Range(range) => Some(range),
            ZoomEvent::Reset => None,
        }
    }
}

impl From<Option<ZoomRange>> for ZoomEvent {
    fn from(value: Option<ZoomRange>) -> Self {
        value.map_or(ZoomEvent::Reset, ZoomEvent::Range)
    }
}

/// Range to apply to one sibling pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomUpdate {
    pub pane: PaneIndex,
    pub range: Option<ZoomRange>,
}

#[derive(Debug, Default)]
pub struct SyncCoordinator {
    synced: [bool; PANE_COUNT],
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sync(&mut self, pane: PaneIndex, enabled: bool) {
        if self.synced[pane.index()] != enabled {
            tracing::info!(%pane, enabled, "Zoom sync toggled");
        }
        self.synced[pane.index()] = enabled;
    }

    pub fn is_synced(&self, pane: PaneIndex) -> bool {
        self.synced[pane.index()]
    }

    /// Panes currently in the sync group.
    pub fn group(&self) -> Vec<PaneIndex> {
        PaneIndex::ALL
            .into_iter()
            .filter(|pane| self.is_synced(*pane))
            .collect()
    }

    /// Updates implied by a zoom event on `trigger`.
    pub fn on_zoom_change(&self, trigger: PaneIndex, event: ZoomEvent) -> Vec<ZoomUpdate> {
        if !self.is_synced(trigger) {
            tracing::trace!(pane = %trigger, "Zoom on unsynced pane ignored");
            return Vec::new();
        }
        let range = event.range();
        self.group()
            .into_iter()
            .filter(|pane| *pane != trigger)
            .map(|pane| ZoomUpdate { pane, range })
            .collect()
    }
}
