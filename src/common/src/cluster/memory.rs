use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    ApiResourceFilter, ApiWarning, ClusterClient, ClusterError, ClusterResult, ClusterSnapshot,
    DeleteOptions, DeleteResponse,
};
use crate::k8s::{ApiResource, GroupVersionKind, LiveObject, ObjectRef, normalize};

/// A delete call as received by [`InMemoryCluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCall {
    pub reference: ObjectRef,
    pub options: DeleteOptions,
}

/// In-process cluster backed by a list of objects.
///
/// Deleting a Namespace removes every object inside it. Failures, warnings
/// and latency can be injected per object, and every delete call is recorded
/// together with the peak number of calls in flight.
#[derive(Debug)]
pub struct InMemoryCluster {
    resources: Vec<ApiResource>,
    objects: Mutex<Vec<LiveObject>>,
    delete_failures: HashMap<ObjectRef, String>,
    delete_warnings: HashMap<ObjectRef, Vec<String>>,
    delete_latency: Duration,
    discovery_failure: Option<String>,
    delete_calls: Mutex<Vec<DeleteCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new(ApiResource::builtin())
    }
}

impl InMemoryCluster {
    pub fn new(resources: Vec<ApiResource>) -> Self {
        Self {
            resources,
            objects: Mutex::new(Vec::new()),
            delete_failures: HashMap::new(),
            delete_warnings: HashMap::new(),
            delete_latency: Duration::ZERO,
            discovery_failure: None,
            delete_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn from_snapshot(snapshot: ClusterSnapshot) -> Self {
        let resources = snapshot
            .api_resources
            .unwrap_or_else(ApiResource::builtin);
        Self::new(resources).with_objects(snapshot.objects)
    }

    pub fn with_objects(mut self, objects: Vec<LiveObject>) -> Self {
        self.objects.get_mut().extend(objects);
        self
    }

    /// Make every delete of `reference` fail with an API error.
    pub fn with_delete_failure(mut self, reference: &ObjectRef, message: impl Into<String>) -> Self {
        self.delete_failures
            .insert(normalize(reference), message.into());
        self
    }

    /// Attach an advisory warning to every delete of `reference`.
    pub fn with_delete_warning(mut self, reference: &ObjectRef, text: impl Into<String>) -> Self {
        self.delete_warnings
            .entry(normalize(reference))
            .or_default()
            .push(text.into());
        self
    }

    pub fn with_delete_latency(mut self, latency: Duration) -> Self {
        self.delete_latency = latency;
        self
    }

    /// Make API resource resolution fail.
    pub fn with_discovery_failure(mut self, message: impl Into<String>) -> Self {
        self.discovery_failure = Some(message.into());
        self
    }

    pub async fn objects(&self) -> Vec<LiveObject> {
        self.objects.lock().await.clone()
    }

    pub async fn contains(&self, reference: &ObjectRef) -> bool {
        let key = normalize(reference);
        self.objects
            .lock()
            .await
            .iter()
            .any(|object| normalize(&object.object_ref()) == key)
    }

    pub async fn delete_calls(&self) -> Vec<DeleteCall> {
        self.delete_calls.lock().await.clone()
    }

    /// Highest number of delete calls that were running at the same time.
    pub fn peak_concurrent_deletes(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard<'_> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        InFlightGuard(&self.in_flight)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn list_all_objects(&self) -> ClusterResult<Vec<LiveObject>> {
        Ok(self.objects().await)
    }

    async fn resolve_api_resources(
        &self,
        filter: ApiResourceFilter<'_>,
    ) -> ClusterResult<Vec<GroupVersionKind>> {
        if let Some(message) = &self.discovery_failure {
            return Err(ClusterError::Discovery(message.clone()));
        }

        Ok(self
            .resources
            .iter()
            .filter(|resource| filter(resource))
            .map(ApiResource::gvk)
            .collect())
    }

    async fn delete_object(&self, reference: &ObjectRef, options: DeleteOptions) -> DeleteResponse {
        let _in_flight = self.enter();

        self.delete_calls.lock().await.push(DeleteCall {
            reference: reference.clone(),
            options,
        });

        if !self.delete_latency.is_zero() {
            tokio::time::sleep(self.delete_latency).await;
        }

        let key = normalize(reference);
        let warnings: Vec<ApiWarning> = self
            .delete_warnings
            .get(&key)
            .map(|texts| texts.iter().map(ApiWarning::new).collect())
            .unwrap_or_default();

        if let Some(message) = self.delete_failures.get(&key) {
            return DeleteResponse::err(ClusterError::Api(message.clone())).with_warnings(warnings);
        }

        let mut objects = self.objects.lock().await;
        let Some(index) = objects
            .iter()
            .position(|object| normalize(&object.object_ref()) == key)
        else {
            let response = if options.ignore_not_found {
                DeleteResponse::ok()
            } else {
                DeleteResponse::err(ClusterError::NotFound(reference.clone()))
            };
            return response.with_warnings(warnings);
        };

        if !options.dry_run {
            objects.remove(index);
            if reference.is_namespace() {
                objects.retain(|object| object.metadata.namespace != reference.name);
            }
        }

        DeleteResponse::ok().with_warnings(warnings)
    }
}
