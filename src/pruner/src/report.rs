//! Deletion results.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::k8s::ObjectRef;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A message recorded against one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(rename = "ref")]
    pub reference: ObjectRef,
    pub message: String,
}

impl ReportEntry {
    pub fn new(reference: ObjectRef, message: impl Into<String>) -> Self {
        Self {
            reference,
            message: message.into(),
        }
    }
}

/// Outcome of one deletion run.
///
/// Every submitted ref ends up in exactly one of `deleted` or `errors`.
/// Warnings are recorded independently of the outcome. `skipped` holds refs
/// that were never submitted because their namespace was deleted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub deleted: Vec<ObjectRef>,
    pub errors: Vec<ReportEntry>,
    pub warnings: Vec<ReportEntry>,
    pub skipped: Vec<ObjectRef>,
}

impl DeletionReport {
    pub fn new(dry_run: bool) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!("prune_{}", started_at.timestamp_millis()),
            started_at,
            completed_at: None,
            dry_run,
            deleted: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            dry_run = self.dry_run,
            deleted = self.deleted.len(),
            errors = self.errors.len(),
            warnings = self.warnings.len(),
            skipped = self.skipped.len(),
            "Deletion run completed"
        );
        for entry in &self.errors {
            tracing::error!(object = %entry.reference, "{}", entry.message);
        }
        for entry in &self.warnings {
            tracing::warn!(object = %entry.reference, "{}", entry.message);
        }
    }
}

/// Shared, append-only view of a [`DeletionReport`] under construction.
///
/// The lock is only held while a single entry is appended.
#[derive(Debug, Clone)]
pub struct ReportAccumulator {
    inner: Arc<Mutex<DeletionReport>>,
}

impl ReportAccumulator {
    pub fn new(dry_run: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DeletionReport::new(dry_run))),
        }
    }

    pub async fn record_deleted(&self, reference: ObjectRef) {
        self.inner.lock().await.deleted.push(reference);
    }

    pub async fn record_error(&self, reference: ObjectRef, message: impl Into<String>) {
        self.inner
            .lock()
            .await
            .errors
            .push(ReportEntry::new(reference, message));
    }

    pub async fn record_warning(&self, reference: ObjectRef, message: impl Into<String>) {
        self.inner
            .lock()
            .await
            .warnings
            .push(ReportEntry::new(reference, message));
    }

    pub async fn record_skipped(&self, reference: ObjectRef) {
        self.inner.lock().await.skipped.push(reference);
    }

    /// Stamp the completion time and return a copy of the report.
    pub async fn finish(&self) -> DeletionReport {
        let mut report = self.inner.lock().await;
        report.completed_at = Some(Utc::now());
        report.clone()
    }
}
