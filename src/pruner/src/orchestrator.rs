use std::sync::Arc;

use common::cluster::ClusterClient;
use common::config::PruneConfig;
use common::k8s::ObjectRef;
use common::status::{LogStatusHandler, StatusHandler};

use crate::cancel::CancelSignal;
use crate::executor::DeletionExecutor;
use crate::metrics::PruneMetrics;
use crate::phases::PhaseTable;
use crate::report::DeletionReport;
use crate::safety::SafetyFilter;
use crate::selector::{PhaseSelector, SelectionError};

/// Selection plus deletion against one cluster.
pub struct Pruner {
    client: Arc<dyn ClusterClient>,
    config: PruneConfig,
    status: Arc<dyn StatusHandler>,
    metrics: PruneMetrics,
    cancel: CancelSignal,
}

impl Pruner {
    pub fn new(client: Arc<dyn ClusterClient>, config: PruneConfig) -> Self {
        Self {
            client,
            config,
            status: Arc::new(LogStatusHandler::default()),
            metrics: PruneMetrics::new(),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_status(mut self, status: Arc<dyn StatusHandler>) -> Self {
        self.status = status;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn metrics(&self) -> &PruneMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    fn selector(&self) -> PhaseSelector {
        PhaseSelector::new(
            self.client.clone(),
            SafetyFilter::from_config(&self.config),
            PhaseTable::from_config(&self.config.phases),
        )
    }

    fn executor(&self) -> DeletionExecutor {
        DeletionExecutor::new(self.client.clone(), self.config.concurrency)
            .with_dry_run(self.config.dry_run)
            .with_status(self.status.clone())
            .with_metrics(self.metrics.clone())
            .with_cancellation(self.cancel.clone())
    }

    /// List the cluster and select everything that may be deleted.
    pub async fn find_objects_for_delete(
        &self,
        honor_skip_if_tagged: bool,
        exclusions: &[ObjectRef],
    ) -> Result<Vec<ObjectRef>, SelectionError> {
        let objects = self
            .client
            .list_all_objects()
            .await
            .map_err(SelectionError::ListObjects)?;

        self.status.trace(&format!(
            "Found {} live objects, {} excluded",
            objects.len(),
            exclusions.len()
        ));

        self.selector()
            .select_for_deletion(&objects, honor_skip_if_tagged, exclusions)
            .await
    }

    pub async fn delete_objects(&self, refs: &[ObjectRef]) -> DeletionReport {
        self.executor()
            .execute_deletion(refs, self.config.wait_for_deletion)
            .await
    }

    /// Select and delete in one go.
    ///
    /// Nothing is deleted when selection fails.
    pub async fn prune(
        &self,
        honor_skip_if_tagged: bool,
        exclusions: &[ObjectRef],
    ) -> Result<DeletionReport, SelectionError> {
        let refs = self
            .find_objects_for_delete(honor_skip_if_tagged, exclusions)
            .await?;

        if refs.is_empty() {
            self.status.info("Nothing to prune");
        } else {
            self.status
                .info(&format!("Pruning {} objects", refs.len()));
        }

        let report = self.delete_objects(&refs).await;
        self.metrics.summary().log();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::cluster::InMemoryCluster;
    use common::k8s::{GroupVersionKind, LiveObject};

    fn scenario() -> Vec<LiveObject> {
        let app = ObjectRef::namespace("app");
        vec![
            LiveObject::new(&GroupVersionKind::new("", "v1", "Namespace"), "", "app")
                .with_manager("kprune"),
            LiveObject::new(&GroupVersionKind::new("apps", "v1", "Deployment"), "app", "web")
                .with_manager("kprune")
                .with_annotation("kprune.io/skip-delete", "true"),
            LiveObject::new(&GroupVersionKind::new("", "v1", "Service"), "app", "svc")
                .with_manager("kprune")
                .with_owner(&app),
        ]
    }

    #[tokio::test]
    async fn test_prune_scenario() {
        let cluster = Arc::new(InMemoryCluster::default().with_objects(scenario()));
        let pruner = Pruner::new(cluster.clone(), PruneConfig::default());

        let selected = pruner.find_objects_for_delete(false, &[]).await.unwrap();
        assert_eq!(selected, vec![ObjectRef::namespace("app")]);

        let report = pruner.prune(false, &[]).await.unwrap();
        assert_eq!(report.deleted, vec![ObjectRef::namespace("app")]);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(pruner.metrics().deleted(), 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_deletes_nothing() {
        let cluster = Arc::new(
            InMemoryCluster::default()
                .with_objects(scenario())
                .with_discovery_failure("the server is currently unable to handle the request"),
        );
        let pruner = Pruner::new(cluster.clone(), PruneConfig::default());

        let result = pruner.prune(false, &[]).await;

        assert!(result.is_err());
        assert!(cluster.delete_calls().await.is_empty());
        assert_eq!(cluster.objects().await.len(), 3);
    }

    #[tokio::test]
    async fn test_config_is_applied() {
        let cluster = Arc::new(InMemoryCluster::default().with_objects(scenario()));
        let config = PruneConfig {
            wait_for_deletion: false,
            dry_run: true,
            ..Default::default()
        };
        let pruner = Pruner::new(cluster.clone(), config);

        let report = pruner.prune(false, &[]).await.unwrap();

        assert!(report.dry_run);
        let calls = cluster.delete_calls().await;
        assert_eq!(calls.len(), 1);
        assert!(calls[0].options.dry_run);
        assert!(!calls[0].options.wait);
        assert_eq!(cluster.objects().await.len(), 3);
    }
}
