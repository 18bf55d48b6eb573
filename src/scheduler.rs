//! Mutation scheduler (debouncing).
//!
//! Bursts of visibility edits are coalesced into a single flush. Every recorded
//! mutation re-arms a quiet-period deadline; the session's event loop sleeps until
//! that deadline and then calls [`MutationScheduler::take_batch`] exactly once.
//!
//! Within one batch the latest value for a `(signal, pane)` pair wins. A pair that is
//! toggled back to the value it had before the batch started yields no delta at all,
//! unless it was recorded with [`MutationScheduler::record_resync`]: a resync cell is
//! pushed with its latest value whatever the chart is believed to show.
//!
//! The scheduler holds no timer itself: re-arming the deadline *is* the cancellation
//! of the previous timer, and because the batch is taken synchronously inside the
//! session loop there is never more than one flush in progress.

use crate::catalog::SignalId;
use crate::matrix::{CellChange, ChangeSet};
use crate::pane::PaneIndex;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default quiet period before a flush.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy)]
struct PendingCell {
    baseline: bool,
    latest: bool,
    resync: bool,
}

/// Deltas applied by one flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushBatch {
    /// 1-based flush counter for the session.
    pub sequence: u64,
    /// Net visibility changes, in first-touched order.
    pub deltas: Vec<CellChange>,
}

#[derive(Debug)]
pub struct MutationScheduler {
    quiet_period: Duration,
    pending: IndexMap<(SignalId, PaneIndex), PendingCell>,
    deadline: Option<Instant>,
    flushes: u64,
}

impl Default for MutationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl MutationScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: IndexMap::new(),
            deadline: None,
            flushes: 0,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Records the result of one mutation call and restarts the quiet period.
    ///
    /// An empty change set still restarts the timer: the table refresh is owed even
    /// when the edit was a no-op.
    pub fn record(&mut self, changes: ChangeSet, now: Instant) {
        for change in changes {
            self.pending
                .entry((change.signal, change.pane))
                .and_modify(|cell| cell.latest = change.visible)
                .or_insert(PendingCell {
                    baseline: !change.visible,
                    latest: change.visible,
                    resync: false,
                });
        }
        self.rearm(now);
    }

    /// Records values the charts must receive even if they look unchanged.
    ///
    /// Used for signals whose chart-side state is unknown, e.g. a signal registered
    /// again after a reset while the charts may still hold its old visibility.
    pub fn record_resync(&mut self, changes: ChangeSet, now: Instant) {
        for change in changes {
            self.pending
                .entry((change.signal, change.pane))
                .and_modify(|cell| {
                    cell.latest = change.visible;
                    cell.resync = true;
                })
                .or_insert(PendingCell {
                    baseline: change.visible,
                    latest: change.visible,
                    resync: true,
                });
        }
        self.rearm(now);
    }

    fn rearm(&mut self, now: Instant) {
        if self.deadline.is_some() {
            tracing::trace!("Pending flush rescheduled");
        }
        self.deadline = Some(now + self.quiet_period);
    }

    /// When the pending flush is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Number of flushes taken so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Takes the accumulated batch and disarms the deadline.
    pub fn take_batch(&mut self) -> FlushBatch {
        self.deadline = None;
        self.flushes += 1;
        let deltas = self
            .pending
            .drain(..)
            .filter(|(_, cell)| cell.resync || cell.latest != cell.baseline)
            .map(|((signal, pane), cell)| CellChange {
                signal,
                pane,
                visible: cell.latest,
            })
            .collect();
        FlushBatch {
            sequence: self.flushes,
            deltas,
        }
    }

    /// Drops anything pending without flushing (full reset).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str, pane: usize, visible: bool) -> CellChange {
        CellChange {
            signal: SignalId::new("a.csv", name),
            pane: PaneIndex::ALL[pane],
            visible,
        }
    }

    #[test]
    fn test_record_rearms_deadline() {
        let mut scheduler = MutationScheduler::default();
        let start = Instant::now();
        scheduler.record(vec![change("X", 0, false)], start);
        assert_eq!(scheduler.deadline(), Some(start + DEFAULT_QUIET_PERIOD));

        let later = start + Duration::from_millis(100);
        scheduler.record(vec![], later);
        assert_eq!(scheduler.deadline(), Some(later + DEFAULT_QUIET_PERIOD));
    }

    #[test]
    fn test_last_write_wins() {
        let mut scheduler = MutationScheduler::default();
        let now = Instant::now();
        scheduler.record(vec![change("X", 1, false)], now);
        scheduler.record(vec![change("X", 1, true)], now);
        scheduler.record(vec![change("X", 1, false)], now);

        let batch = scheduler.take_batch();
        assert_eq!(batch.sequence, 1);
        assert_eq!(batch.deltas, vec![change("X", 1, false)]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_toggle_back_produces_no_delta() {
        let mut scheduler = MutationScheduler::default();
        let now = Instant::now();
        scheduler.record(vec![change("X", 2, false)], now);
        scheduler.record(vec![change("X", 2, true)], now);

        let batch = scheduler.take_batch();
        assert!(batch.deltas.is_empty());
        assert_eq!(scheduler.flush_count(), 1);
    }

    #[test]
    fn test_batches_are_independent() {
        let mut scheduler = MutationScheduler::default();
        let now = Instant::now();
        scheduler.record(vec![change("X", 0, false), change("Y", 0, false)], now);
        assert_eq!(scheduler.take_batch().deltas.len(), 2);

        scheduler.record(vec![change("X", 0, true)], now);
        let batch = scheduler.take_batch();
        assert_eq!(batch.sequence, 2);
        assert_eq!(batch.deltas, vec![change("X", 0, true)]);
    }

    #[test]
    fn test_resync_is_pushed_even_when_unchanged() {
        let mut scheduler = MutationScheduler::default();
        let now = Instant::now();
        scheduler.record_resync(vec![change("X", 1, true)], now);
        assert_eq!(scheduler.deadline(), Some(now + DEFAULT_QUIET_PERIOD));

        // A later edit in the same batch still wins, and is pushed even if it
        // returns to the resync value.
        scheduler.record(vec![change("X", 1, false)], now);
        scheduler.record(vec![change("X", 1, true)], now);

        let batch = scheduler.take_batch();
        assert_eq!(batch.deltas, vec![change("X", 1, true)]);
    }

    #[test]
    fn test_clear() {
        let mut scheduler = MutationScheduler::new(Duration::from_millis(50));
        scheduler.record(vec![change("X", 0, false)], Instant::now());
        scheduler.clear();
        assert!(!scheduler.has_pending());
        assert!(scheduler.take_batch().deltas.is_empty());
    }
}
