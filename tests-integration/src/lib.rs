/// Common test utilities and helpers for integration tests
use std::path::PathBuf;

use common::cluster::ClusterSnapshot;
use common::k8s::ObjectRef;
use tempfile::TempDir;

pub mod fixtures;

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Snapshot and exclusion documents written to a temporary directory
pub struct SnapshotFiles {
    pub snapshot: PathBuf,
    pub exclusions: PathBuf,
    _temp_dir: TempDir,
}

impl SnapshotFiles {
    pub fn write(snapshot: &ClusterSnapshot, exclusions: &[ObjectRef]) -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;

        let snapshot_path = temp_dir.path().join("cluster.yaml");
        std::fs::write(&snapshot_path, serde_yaml::to_string(snapshot)?)?;

        let exclusions_path = temp_dir.path().join("exclusions.yaml");
        std::fs::write(&exclusions_path, serde_yaml::to_string(exclusions)?)?;

        Ok(Self {
            snapshot: snapshot_path,
            exclusions: exclusions_path,
            _temp_dir: temp_dir,
        })
    }
}
