//! Concurrent deletion of selected objects.
//!
//! Deletion runs in two passes. Namespaces go first; once they are gone the
//! remaining refs are deleted, except those living in a namespace from the
//! first pass since the API server removes them with their namespace.
//!
//! Both passes share one bounded worker pool. Within a pass there is no
//! ordering between deletions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::cluster::{ClusterClient, DeleteOptions};
use common::k8s::ObjectRef;
use common::status::{EndResult, LogStatusHandler, StatusHandler, StatusLine};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelSignal;
use crate::metrics::PruneMetrics;
use crate::report::{DeletionReport, ReportAccumulator};

pub const DEFAULT_CONCURRENCY: usize = 8;

const CANCELLED_MESSAGE: &str = "deletion cancelled";

pub struct DeletionExecutor {
    client: Arc<dyn ClusterClient>,
    semaphore: Arc<Semaphore>,
    dry_run: bool,
    status: Arc<dyn StatusHandler>,
    metrics: PruneMetrics,
    cancel: CancelSignal,
}

impl DeletionExecutor {
    /// Create an executor allowing `concurrency` delete calls in flight.
    ///
    /// A concurrency of zero is raised to one.
    pub fn new(client: Arc<dyn ClusterClient>, concurrency: usize) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            dry_run: false,
            status: Arc::new(LogStatusHandler::default()),
            metrics: PruneMetrics::new(),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusHandler>) -> Self {
        self.status = status;
        self
    }

    pub fn with_metrics(mut self, metrics: PruneMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn metrics(&self) -> &PruneMetrics {
        &self.metrics
    }

    /// Delete `refs` and report what happened to each of them.
    ///
    /// Individual failures never abort the run. Not-found counts as deleted.
    pub async fn execute_deletion(&self, refs: &[ObjectRef], wait: bool) -> DeletionReport {
        let report = ReportAccumulator::new(self.dry_run);

        let (namespaces, others): (Vec<ObjectRef>, Vec<ObjectRef>) =
            refs.iter().cloned().partition(ObjectRef::is_namespace);
        let deleted_namespaces: HashSet<String> =
            namespaces.iter().map(|reference| reference.name.clone()).collect();

        info!(
            namespaces = namespaces.len(),
            objects = others.len(),
            wait,
            dry_run = self.dry_run,
            "Starting deletion"
        );

        self.run_pass("Deleting namespaces", namespaces, wait, &report)
            .await;

        let mut remaining = Vec::with_capacity(others.len());
        for reference in others {
            if !reference.namespace.is_empty() && deleted_namespaces.contains(&reference.namespace) {
                debug!(object = %reference, "Skipping object in deleted namespace");
                self.metrics.record_skipped_by_namespace();
                report.record_skipped(reference).await;
            } else {
                remaining.push(reference);
            }
        }

        self.run_pass("Deleting objects", remaining, wait, &report)
            .await;

        let report = report.finish().await;
        report.log_summary();
        report
    }

    async fn run_pass(
        &self,
        message: &str,
        refs: Vec<ObjectRef>,
        wait: bool,
        report: &ReportAccumulator,
    ) {
        if refs.is_empty() {
            return;
        }

        let line: Arc<dyn StatusLine> = Arc::from(self.status.start_status(refs.len() as u64, message));
        let worker = Worker {
            client: self.client.clone(),
            semaphore: self.semaphore.clone(),
            cancel: self.cancel.clone(),
            metrics: self.metrics.clone(),
            report: report.clone(),
            line: line.clone(),
            pass: Arc::new(PassState::default()),
            options: DeleteOptions {
                wait,
                ignore_not_found: true,
                dry_run: self.dry_run,
            },
        };

        let mut tasks = JoinSet::new();
        let mut spawned = HashMap::with_capacity(refs.len());
        for reference in refs {
            let handle = tasks.spawn(worker.clone().delete(reference.clone()));
            spawned.insert(handle.id(), reference);
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Deletion task failed");
                worker.pass.errored.store(true, Ordering::Relaxed);
                // a task that died never recorded its outcome
                if let Some(reference) = spawned.remove(&e.id()) {
                    self.metrics.record_failure();
                    report
                        .record_error(reference, format!("deletion task failed: {e}"))
                        .await;
                    line.increment();
                }
            }
        }

        line.end(worker.pass.end_result());
    }
}

#[derive(Debug, Default)]
struct PassState {
    warned: AtomicBool,
    errored: AtomicBool,
}

impl PassState {
    fn end_result(&self) -> EndResult {
        if self.errored.load(Ordering::Relaxed) {
            EndResult::Error
        } else if self.warned.load(Ordering::Relaxed) {
            EndResult::Warning
        } else {
            EndResult::Success
        }
    }
}

#[derive(Clone)]
struct Worker {
    client: Arc<dyn ClusterClient>,
    semaphore: Arc<Semaphore>,
    cancel: CancelSignal,
    metrics: PruneMetrics,
    report: ReportAccumulator,
    line: Arc<dyn StatusLine>,
    pass: Arc<PassState>,
    options: DeleteOptions,
}

impl Worker {
    async fn delete(self, reference: ObjectRef) {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            self.cancelled(reference).await;
            return;
        };

        self.metrics.record_attempt();
        debug!(object = %reference, "Deleting object");

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            response = self.client.delete_object(&reference, self.options) => Some(response),
        };
        drop(permit);

        let Some(response) = response else {
            self.cancelled(reference).await;
            return;
        };

        if !response.warnings.is_empty() {
            self.metrics.record_warnings(response.warnings.len());
            self.pass.warned.store(true, Ordering::Relaxed);
            for warning in response.warnings {
                warn!(object = %reference, "{}", warning.text);
                self.report
                    .record_warning(reference.clone(), warning.text)
                    .await;
            }
        }

        match response.result {
            Ok(()) => {
                self.metrics.record_deleted();
                self.report.record_deleted(reference).await;
            }
            Err(e) if e.is_not_found() => {
                debug!(object = %reference, "Object already gone");
                self.metrics.record_deleted();
                self.report.record_deleted(reference).await;
            }
            Err(e) => {
                warn!(object = %reference, error = %e, "Failed to delete object");
                self.metrics.record_failure();
                self.pass.errored.store(true, Ordering::Relaxed);
                self.report.record_error(reference, e.to_string()).await;
            }
        }

        self.line.increment();
    }

    async fn cancelled(&self, reference: ObjectRef) {
        debug!(object = %reference, "Deletion cancelled");
        self.metrics.record_cancelled();
        self.pass.errored.store(true, Ordering::Relaxed);
        self.report.record_error(reference, CANCELLED_MESSAGE).await;
        self.line.increment();
    }
}
