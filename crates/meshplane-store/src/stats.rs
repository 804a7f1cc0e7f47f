//! Store statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for store operations.
///
/// All counters are atomic and safe to read from any thread.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Number of publishes.
    publishes: AtomicU64,
    /// Number of snapshot reads.
    reads: AtomicU64,
    /// Number of reads that fell back to the built-in default.
    default_reads: AtomicU64,
}

impl StoreStats {
    /// Create new store statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_publish(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_default_read(&self) {
        self.default_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Total publishes.
    #[inline]
    #[must_use]
    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    /// Total snapshot reads.
    #[inline]
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Reads that returned the built-in empty default.
    #[inline]
    #[must_use]
    pub fn default_reads(&self) -> u64 {
        self.default_reads.load(Ordering::Relaxed)
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.publishes.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.default_reads.store(0, Ordering::Relaxed);
    }
}
