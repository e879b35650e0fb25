/*!
 * Fire Path Diagnostics
 * Lock-free counters recording what happened to each fire call
 *
 * Fire errors never reach the instrumented code; they land here instead.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-probe fire counters
#[derive(Debug, Default)]
pub struct FireCounters {
    fired: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`FireCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireStats {
    /// Events handed to the tracing subsystem
    pub fired: u64,
    /// Fire calls skipped because no tracer was listening
    pub skipped: u64,
    /// Fire calls abandoned because the arguments could not be marshaled
    pub dropped: u64,
}

impl FireCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FireStats {
        FireStats {
            fired: self.fired.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl FireStats {
    /// Total fire calls observed
    pub fn total(&self) -> u64 {
        self.fired + self.skipped + self.dropped
    }
}

impl std::ops::Add for FireStats {
    type Output = FireStats;

    fn add(self, rhs: FireStats) -> FireStats {
        FireStats {
            fired: self.fired + rhs.fired,
            skipped: self.skipped + rhs.skipped,
            dropped: self.dropped + rhs.dropped,
        }
    }
}

impl std::iter::Sum for FireStats {
    fn sum<I: Iterator<Item = FireStats>>(iter: I) -> FireStats {
        iter.fold(FireStats::default(), |acc, s| acc + s)
    }
}
