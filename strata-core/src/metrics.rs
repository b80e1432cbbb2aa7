//! # Metrics
//!
//! Lightweight atomic counters for monitoring store activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    // Write metrics
    puts: AtomicU64,
    put_errors: AtomicU64,
    wal_appends: AtomicU64,
    wal_bytes: AtomicU64,
    flushes: AtomicU64,
    segments_written: AtomicU64,

    // Read metrics
    gets: AtomicU64,
    segment_reads: AtomicU64,
    replays: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_put(&self) {
        self.inner.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_put_error(&self) {
        self.inner.put_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wal_append(&self, bytes: u64) {
        self.inner.wal_appends.fetch_add(1, Ordering::Relaxed);
        self.inner.wal_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.inner.flushes.fetch_add(1, Ordering::Relaxed);
        self.inner.segments_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.inner.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment_read(&self) {
        self.inner.segment_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self) {
        self.inner.replays.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            puts: self.inner.puts.load(Ordering::Relaxed),
            put_errors: self.inner.put_errors.load(Ordering::Relaxed),
            wal_appends: self.inner.wal_appends.load(Ordering::Relaxed),
            wal_bytes: self.inner.wal_bytes.load(Ordering::Relaxed),
            flushes: self.inner.flushes.load(Ordering::Relaxed),
            segments_written: self.inner.segments_written.load(Ordering::Relaxed),
            gets: self.inner.gets.load(Ordering::Relaxed),
            segment_reads: self.inner.segment_reads.load(Ordering::Relaxed),
            replays: self.inner.replays.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub puts: u64,
    pub put_errors: u64,
    pub wal_appends: u64,
    pub wal_bytes: u64,
    pub flushes: u64,
    pub segments_written: u64,
    pub gets: u64,
    pub segment_reads: u64,
    pub replays: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.record_put();
        metrics.record_put();
        metrics.record_wal_append(128);
        metrics.record_flush();

        let snap = metrics.snapshot();
        assert_eq!(snap.puts, 2);
        assert_eq!(snap.wal_appends, 1);
        assert_eq!(snap.wal_bytes, 128);
        assert_eq!(snap.flushes, 1);
        assert_eq!(snap.segments_written, 1);
    }
}
