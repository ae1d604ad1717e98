//! Phase-ordered selection of objects to delete.

use std::collections::HashSet;
use std::sync::Arc;

use common::cluster::{ClusterClient, ClusterError};
use common::k8s::{ApiResource, GroupKind, LiveObject, ObjectRef};
use tracing::{debug, info, trace};

use crate::exclusion::ExclusionSet;
use crate::phases::{Phase, PhaseTable};
use crate::safety::SafetyFilter;

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Failed to resolve API resources for phase {index} ({phase})")]
    Discovery {
        index: usize,
        phase: String,
        #[source]
        source: ClusterError,
    },

    #[error("Failed to resolve cluster-scoped resources")]
    Scope(#[source] ClusterError),

    #[error("Failed to list live objects")]
    ListObjects(#[source] ClusterError),
}

/// Walks the phase table and picks the objects each phase may delete.
pub struct PhaseSelector {
    client: Arc<dyn ClusterClient>,
    filter: SafetyFilter,
    phases: PhaseTable,
}

impl PhaseSelector {
    pub fn new(client: Arc<dyn ClusterClient>, filter: SafetyFilter, phases: PhaseTable) -> Self {
        Self {
            client,
            filter,
            phases,
        }
    }

    /// Ordered refs to delete, earlier phases first.
    ///
    /// Objects claimed by one phase are excluded from every later phase.
    /// A discovery failure aborts the whole selection.
    pub async fn select_for_deletion(
        &self,
        live_objects: &[LiveObject],
        honor_skip_if_tagged: bool,
        initial_exclusions: &[ObjectRef],
    ) -> Result<Vec<ObjectRef>, SelectionError> {
        let cluster_scoped = self
            .client
            .resolve_api_resources(&|resource: &ApiResource| !resource.namespaced)
            .await
            .map_err(SelectionError::Scope)?
            .iter()
            .map(|gvk| gvk.group_kind())
            .collect();

        let mut exclusions = ExclusionSet::new(cluster_scoped);
        exclusions.extend(initial_exclusions);

        info!(
            objects = live_objects.len(),
            exclusions = exclusions.len(),
            phases = self.phases.len(),
            honor_skip_if_tagged,
            "Selecting objects for deletion"
        );

        let mut selected = Vec::new();
        for (index, phase) in self.phases.iter().enumerate() {
            let resolved_kinds = self.resolve_phase(index, phase).await?;

            let mut claimed = 0usize;
            for object in live_objects {
                match self.filter.check(
                    object,
                    &resolved_kinds,
                    &exclusions,
                    honor_skip_if_tagged,
                ) {
                    Ok(()) => {
                        let reference = object.object_ref();
                        exclusions.insert(&reference);
                        selected.push(reference);
                        claimed += 1;
                    }
                    Err(reason) => {
                        trace!(phase = %phase, object = %object.object_ref(), %reason, "Keeping object");
                    }
                }
            }

            debug!(
                phase = %phase,
                kinds = resolved_kinds.len(),
                candidates = claimed,
                "Phase selection finished"
            );
        }

        info!(candidates = selected.len(), "Selection finished");
        Ok(selected)
    }

    async fn resolve_phase(
        &self,
        index: usize,
        phase: &Phase,
    ) -> Result<HashSet<GroupKind>, SelectionError> {
        let resolved = self
            .client
            .resolve_api_resources(&|resource: &ApiResource| phase.matches(resource))
            .await
            .map_err(|source| SelectionError::Discovery {
                index,
                phase: phase.to_string(),
                source,
            })?;

        Ok(resolved.iter().map(|gvk| gvk.group_kind()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::cluster::InMemoryCluster;
    use common::k8s::GroupVersionKind;

    fn namespace(name: &str) -> LiveObject {
        LiveObject::new(&GroupVersionKind::new("", "v1", "Namespace"), "", name).with_manager("kprune")
    }

    fn deployment(namespace: &str, name: &str) -> LiveObject {
        LiveObject::new(&GroupVersionKind::new("apps", "v1", "Deployment"), namespace, name)
            .with_manager("kprune")
    }

    fn config_map(namespace: &str, name: &str) -> LiveObject {
        LiveObject::new(&GroupVersionKind::new("", "v1", "ConfigMap"), namespace, name)
            .with_manager("kprune")
    }

    fn certificate(namespace: &str, name: &str) -> LiveObject {
        LiveObject::new(
            &GroupVersionKind::new("cert-manager.io", "v1", "Certificate"),
            namespace,
            name,
        )
        .with_manager("kprune")
    }

    fn selector(cluster: InMemoryCluster) -> PhaseSelector {
        PhaseSelector::new(Arc::new(cluster), SafetyFilter::default(), PhaseTable::default())
    }

    fn names(refs: &[ObjectRef]) -> Vec<String> {
        refs.iter().map(ToString::to_string).collect()
    }

    fn cluster_with_certificates() -> InMemoryCluster {
        let mut resources = ApiResource::builtin();
        resources.push(ApiResource::new(
            "cert-manager.io",
            "v1",
            "Certificate",
            "certificates",
            true,
        ));
        InMemoryCluster::new(resources)
    }

    #[tokio::test]
    async fn test_namespace_precedes_its_workloads() {
        let objects = vec![deployment("ns1", "web"), namespace("ns1")];
        let selected = selector(InMemoryCluster::default())
            .select_for_deletion(&objects, false, &[])
            .await
            .unwrap();

        assert_eq!(names(&selected), ["Namespace/ns1", "Deployment/ns1/web"]);
    }

    #[tokio::test]
    async fn test_phase_order_and_live_order_within_phase() {
        let objects = vec![
            config_map("app", "settings"),
            deployment("app", "b"),
            certificate("app", "tls"),
            deployment("app", "a"),
            namespace("app"),
        ];
        let selected = selector(cluster_with_certificates())
            .select_for_deletion(&objects, false, &[])
            .await
            .unwrap();

        assert_eq!(
            names(&selected),
            [
                "Namespace/app",
                "Certificate/app/tls",
                "Deployment/app/b",
                "Deployment/app/a",
                "ConfigMap/app/settings",
            ]
        );
    }

    #[tokio::test]
    async fn test_each_object_selected_once() {
        // a Service matches both the workload phase and the catch-all phase
        let service = LiveObject::new(&GroupVersionKind::new("", "v1", "Service"), "app", "svc")
            .with_manager("kprune");
        let selected = selector(InMemoryCluster::default())
            .select_for_deletion(&[service], false, &[])
            .await
            .unwrap();

        assert_eq!(names(&selected), ["Service/app/svc"]);
    }

    #[tokio::test]
    async fn test_initial_exclusions_are_respected() {
        let objects = vec![deployment("app", "web"), deployment("app", "api")];
        let mut desired = objects[0].object_ref();
        desired.gvk.version = "v1beta1".to_string();

        let selected = selector(InMemoryCluster::default())
            .select_for_deletion(&objects, false, &[desired])
            .await
            .unwrap();

        assert_eq!(names(&selected), ["Deployment/app/api"]);
    }

    #[tokio::test]
    async fn test_cluster_scoped_exclusion_with_stray_namespace() {
        let cluster_role = LiveObject::new(
            &GroupVersionKind::new("rbac.authorization.k8s.io", "v1", "ClusterRole"),
            "",
            "reader",
        )
        .with_manager("kprune");
        let mut desired = cluster_role.object_ref();
        desired.namespace = "app".to_string();

        let selected = selector(InMemoryCluster::default())
            .select_for_deletion(&[cluster_role], false, &[desired])
            .await
            .unwrap();

        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn test_selection_is_idempotent() {
        let objects = vec![
            namespace("app"),
            deployment("app", "web"),
            config_map("app", "settings"),
            deployment("other", "api").with_annotation("kprune.io/skip-delete", "true"),
        ];
        let selector = selector(InMemoryCluster::default());

        let first = selector.select_for_deletion(&objects, true, &[]).await.unwrap();
        let second = selector.select_for_deletion(&objects, true, &[]).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_kinds_are_never_selected() {
        let unknown = LiveObject::new(
            &GroupVersionKind::new("example.com", "v1", "Widget"),
            "app",
            "w",
        )
        .with_manager("kprune");

        let selected = selector(InMemoryCluster::default())
            .select_for_deletion(&[unknown], false, &[])
            .await
            .unwrap();

        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_selection() {
        let cluster = InMemoryCluster::default().with_discovery_failure("connection refused");
        let result = selector(cluster)
            .select_for_deletion(&[namespace("app")], false, &[])
            .await;

        let Err(error) = result else {
            panic!("selection must fail");
        };
        assert!(matches!(error, SelectionError::Scope(_)));

        // the cause is reported once, by the source chain
        let mut chain = vec![error.to_string()];
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = std::error::Error::source(cause);
        }
        let mentions = chain
            .iter()
            .filter(|message| message.contains("connection refused"))
            .count();
        assert_eq!(mentions, 1);
    }

    #[tokio::test]
    async fn test_custom_phase_table() {
        let phases = PhaseTable::new(vec![Phase::new(["configmaps"]), Phase::new(["Deployment"])]);
        let selector = PhaseSelector::new(
            Arc::new(InMemoryCluster::default()),
            SafetyFilter::default(),
            phases,
        );
        let objects = vec![
            namespace("app"),
            deployment("app", "web"),
            config_map("app", "settings"),
        ];

        let selected = selector.select_for_deletion(&objects, false, &[]).await.unwrap();

        // no catch-all phase, so the namespace is never claimed
        assert_eq!(names(&selected), ["ConfigMap/app/settings", "Deployment/app/web"]);
    }
}
