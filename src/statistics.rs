//! Removal statistics.
//!
//! The worker reports every removed container to a
//! [`StatisticsCollector`] and signals the end of each drained batch.
//! [`RemovalStatistics`] is the default collector: it keeps running
//! totals and a summary of the last finished cycle.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::debug;

use crate::identifiers::ContainerId;

// ============================================================================
// StatisticsCollector
// ============================================================================

/// Receives removal statistics from the worker.
pub trait StatisticsCollector: Send + Sync {
    /// Records one removal.
    fn update(&self, history_cleared: usize, cookie_count: usize, container_id: &ContainerId);

    /// Signals that a removal batch drained.
    fn finish(&self);
}

// ============================================================================
// Types
// ============================================================================

/// Totals of one removal cycle, or of all cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalTotals {
    /// Containers removed.
    pub containers_deleted: usize,
    /// Cookies deleted along with them.
    pub cookies_deleted: usize,
    /// History entries purged.
    pub history_cleared: usize,
    /// History-deleting containers removed.
    pub deletes_history_containers_deleted: usize,
}

impl RemovalTotals {
    fn add(&mut self, history_cleared: usize, cookie_count: usize) {
        self.containers_deleted += 1;
        self.cookies_deleted += cookie_count;
        self.history_cleared += history_cleared;
        if history_cleared > 0 {
            self.deletes_history_containers_deleted += 1;
        }
    }
}

#[derive(Debug, Default)]
struct StatisticsState {
    total: RemovalTotals,
    current: RemovalTotals,
    last_cycle: Option<RemovalTotals>,
}

// ============================================================================
// RemovalStatistics
// ============================================================================

/// In-memory statistics collector.
#[derive(Debug, Default)]
pub struct RemovalStatistics {
    state: Mutex<StatisticsState>,
}

impl RemovalStatistics {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals since creation.
    #[must_use]
    pub fn total(&self) -> RemovalTotals {
        self.state.lock().total
    }

    /// Totals of the last cycle that removed at least one container.
    #[must_use]
    pub fn last_cycle(&self) -> Option<RemovalTotals> {
        self.state.lock().last_cycle
    }
}

impl StatisticsCollector for RemovalStatistics {
    fn update(&self, history_cleared: usize, cookie_count: usize, container_id: &ContainerId) {
        debug!(
            container_id = %container_id,
            history_cleared,
            cookie_count,
            "Recording container removal"
        );
        let mut state = self.state.lock();
        state.total.add(history_cleared, cookie_count);
        state.current.add(history_cleared, cookie_count);
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        if state.current.containers_deleted > 0 {
            let cycle = std::mem::take(&mut state.current);
            debug!(
                containers = cycle.containers_deleted,
                cookies = cycle.cookies_deleted,
                "Removal cycle finished"
            );
            state.last_cycle = Some(cycle);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
