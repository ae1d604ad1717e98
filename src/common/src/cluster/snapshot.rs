//! Cluster snapshot documents.
//!
//! A snapshot is a YAML (or JSON) document holding discovery data and the
//! objects of a cluster. It seeds an [`InMemoryCluster`](super::InMemoryCluster).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::k8s::{ApiResource, LiveObject, ObjectRef};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    /// Discovery data; the builtin resource list is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_resources: Option<Vec<ApiResource>>,
    #[serde(default)]
    pub objects: Vec<LiveObject>,
}

impl ClusterSnapshot {
    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        read_yaml(path)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// Load the refs of objects that must never be deleted.
///
/// The document is a plain list of refs (`group`, `version`, `kind`,
/// `namespace`, `name`).
pub fn load_exclusions(path: &Path) -> Result<Vec<ObjectRef>, SnapshotError> {
    read_yaml(path)
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SnapshotError> {
    let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
