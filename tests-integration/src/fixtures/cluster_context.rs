use std::sync::Arc;

use common::cluster::InMemoryCluster;
use common::config::PruneConfig;
use common::k8s::LiveObject;
use pruner::Pruner;

use super::operator_resources;

/// In-memory cluster shared between a test and the pruner under test
pub struct ClusterTestContext {
    pub cluster: Arc<InMemoryCluster>,
}

impl ClusterTestContext {
    pub fn new(objects: Vec<LiveObject>) -> Self {
        Self::from_cluster(InMemoryCluster::new(operator_resources()).with_objects(objects))
    }

    pub fn from_cluster(cluster: InMemoryCluster) -> Self {
        crate::init_test_logging();
        Self {
            cluster: Arc::new(cluster),
        }
    }

    pub fn pruner(&self, config: PruneConfig) -> Pruner {
        Pruner::new(self.cluster.clone(), config)
    }

    /// Objects still present, formatted as `Kind/namespace/name`
    pub async fn remaining(&self) -> Vec<String> {
        self.cluster
            .objects()
            .await
            .iter()
            .map(|object| object.object_ref().to_string())
            .collect()
    }

    /// Refs of every delete call, in the order they were received
    pub async fn delete_order(&self) -> Vec<String> {
        self.cluster
            .delete_calls()
            .await
            .iter()
            .map(|call| call.reference.to_string())
            .collect()
    }
}
