//! Prune metrics tracking
//!
//! Thread-safe counters for deletion runs, shared between the executor's
//! worker tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe metrics for tracking deletions
#[derive(Debug, Clone, Default)]
pub struct PruneMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    attempted: AtomicUsize,
    deleted: AtomicUsize,
    failed: AtomicUsize,
    warnings: AtomicUsize,
    skipped_by_namespace: AtomicUsize,
    cancelled: AtomicUsize,
}

impl PruneMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delete call being submitted
    pub fn record_attempt(&self) {
        self.inner.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.inner.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warnings(&self, count: usize) {
        self.inner.warnings.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a ref that was dropped because its namespace is being deleted
    pub fn record_skipped_by_namespace(&self) {
        self.inner
            .skipped_by_namespace
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.inner.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempted(&self) -> usize {
        self.inner.attempted.load(Ordering::Relaxed)
    }

    pub fn deleted(&self) -> usize {
        self.inner.deleted.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.inner.failed.load(Ordering::Relaxed)
    }

    pub fn warnings(&self) -> usize {
        self.inner.warnings.load(Ordering::Relaxed)
    }

    pub fn skipped_by_namespace(&self) -> usize {
        self.inner.skipped_by_namespace.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> usize {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Get a summary of all metrics
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            attempted: self.attempted(),
            deleted: self.deleted(),
            failed: self.failed(),
            warnings: self.warnings(),
            skipped_by_namespace: self.skipped_by_namespace(),
            cancelled: self.cancelled(),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
    pub warnings: usize,
    pub skipped_by_namespace: usize,
    pub cancelled: usize,
}

impl MetricsSummary {
    /// Share of attempted deletions that succeeded, 0.0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        if self.attempted > 0 {
            self.deleted as f64 / self.attempted as f64
        } else {
            0.0
        }
    }

    /// Log the metrics summary
    pub fn log(&self) {
        tracing::info!("=== Prune Metrics Summary ===");
        tracing::info!(
            "Deletions: {} attempted, {} deleted, {} failed, {} cancelled",
            self.attempted,
            self.deleted,
            self.failed,
            self.cancelled
        );
        tracing::info!(
            "Skipped: {} covered by namespace deletion",
            self.skipped_by_namespace
        );
        tracing::info!(
            "Warnings: {} ({:.1}% success rate)",
            self.warnings,
            self.success_rate() * 100.0
        );
    }
}
