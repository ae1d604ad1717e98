//! Cluster client abstraction.
//!
//! The pruning core never talks to an API server directly. It lists objects,
//! resolves discovery data and deletes objects through [`ClusterClient`].
//! [`InMemoryCluster`] is an in-process implementation used by the CLI's
//! snapshot mode and by tests.

use crate::k8s::{ApiResource, GroupVersionKind, LiveObject, ObjectRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod snapshot;

pub use memory::{DeleteCall, InMemoryCluster};
pub use snapshot::{ClusterSnapshot, SnapshotError, load_exclusions};

/// Errors returned by cluster operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClusterError {
    #[error("{0} not found")]
    NotFound(ObjectRef),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to resolve API resources: {0}")]
    Discovery(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Advisory warning returned by the API server alongside a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiWarning {
    pub text: String,
}

impl ApiWarning {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOptions {
    /// Block until the object is gone instead of returning once accepted.
    pub wait: bool,
    /// Report success when the object does not exist.
    pub ignore_not_found: bool,
    /// Ask the server to validate the delete without persisting it.
    pub dry_run: bool,
}

/// Outcome of a delete call.
///
/// Warnings are returned on success and on failure alike.
#[derive(Debug, Clone)]
pub struct DeleteResponse {
    pub warnings: Vec<ApiWarning>,
    pub result: ClusterResult<()>,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            result: Ok(()),
        }
    }

    pub fn err(error: ClusterError) -> Self {
        Self {
            warnings: Vec::new(),
            result: Err(error),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<ApiWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Predicate over discovery records.
pub type ApiResourceFilter<'a> = &'a (dyn Fn(&ApiResource) -> bool + Send + Sync);

/// Read/delete access to a live cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    /// Snapshot of every object the client can see.
    async fn list_all_objects(&self) -> ClusterResult<Vec<LiveObject>>;

    /// Preferred versions of the resource types accepted by `filter`.
    async fn resolve_api_resources(
        &self,
        filter: ApiResourceFilter<'_>,
    ) -> ClusterResult<Vec<GroupVersionKind>>;

    async fn delete_object(&self, reference: &ObjectRef, options: DeleteOptions) -> DeleteResponse;
}
