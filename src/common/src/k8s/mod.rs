//! Kubernetes object identity and metadata model.
//!
//! Only the pieces of an object that matter for pruning are modelled here:
//! its identity ([`ObjectRef`]) and the provenance metadata carried in
//! [`LiveObject`] (annotations, owner references and managed-field managers).

mod object;

pub use object::{LiveObject, ManagedFieldsEntry, ObjectMeta, OwnerReference};

use serde::{Deserialize, Serialize};
use std::fmt;

/// API group + kind, the version independent part of a type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKind {
    #[serde(default)]
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group, empty for the core group.
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Split an `apiVersion` string (`v1`, `apps/v1`) into group and version.
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }

    /// The `apiVersion` string for this type.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Identity of a single object in a cluster.
///
/// The derived equality compares every field including the version. Use
/// [`normalize`] before comparing refs for "same object" purposes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(flatten)]
    pub gvk: GroupVersionKind,
    /// Empty for cluster-scoped objects.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(gvk: GroupVersionKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gvk,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Ref to a core `v1` Namespace.
    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(GroupVersionKind::new("", "v1", "Namespace"), "", name)
    }

    /// True for Namespace objects of the core group, whatever the version.
    pub fn is_namespace(&self) -> bool {
        self.gvk.group.is_empty() && self.gvk.kind == "Namespace"
    }

    pub fn group_kind(&self) -> GroupKind {
        self.gvk.group_kind()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.gvk.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.gvk.kind, self.namespace, self.name)
        }
    }
}

/// Drop the version from a ref.
///
/// Two refs that only differ in API version name the same object.
pub fn normalize(reference: &ObjectRef) -> ObjectRef {
    let mut normalized = reference.clone();
    normalized.gvk.version.clear();
    normalized
}

/// Discovery record of one served resource type (preferred version).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural resource name, e.g. `deployments`.
    pub name: String,
    #[serde(default = "default_namespaced")]
    pub namespaced: bool,
}

fn default_namespaced() -> bool {
    true
}

impl ApiResource {
    pub fn new(
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
        namespaced: bool,
    ) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            namespaced,
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(self.group.clone(), self.version.clone(), self.kind.clone())
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }

    /// Whether `identifier` names this resource by plural name, group or kind.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.name == identifier || self.group == identifier || self.kind == identifier
    }

    /// Resource types every cluster serves.
    pub fn builtin() -> Vec<ApiResource> {
        vec![
            Self::new("", "v1", "Namespace", "namespaces", false),
            Self::new("", "v1", "ConfigMap", "configmaps", true),
            Self::new("", "v1", "Secret", "secrets", true),
            Self::new("", "v1", "Service", "services", true),
            Self::new("", "v1", "ServiceAccount", "serviceaccounts", true),
            Self::new("", "v1", "Pod", "pods", true),
            Self::new("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims", true),
            Self::new("", "v1", "PersistentVolume", "persistentvolumes", false),
            Self::new("apps", "v1", "Deployment", "deployments", true),
            Self::new("apps", "v1", "StatefulSet", "statefulsets", true),
            Self::new("apps", "v1", "DaemonSet", "daemonsets", true),
            Self::new("apps", "v1", "ReplicaSet", "replicasets", true),
            Self::new("batch", "v1", "Job", "jobs", true),
            Self::new("batch", "v1", "CronJob", "cronjobs", true),
            Self::new("networking.k8s.io", "v1", "Ingress", "ingresses", true),
            Self::new("rbac.authorization.k8s.io", "v1", "Role", "roles", true),
            Self::new("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings", true),
            Self::new("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles", false),
            Self::new(
                "rbac.authorization.k8s.io",
                "v1",
                "ClusterRoleBinding",
                "clusterrolebindings",
                false,
            ),
            Self::new(
                "apiextensions.k8s.io",
                "v1",
                "CustomResourceDefinition",
                "customresourcedefinitions",
                false,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_round_trip() {
        let core = GroupVersionKind::from_api_version("v1", "ConfigMap");
        assert_eq!(core.group, "");
        assert_eq!(core.version, "v1");
        assert_eq!(core.api_version(), "v1");

        let apps = GroupVersionKind::from_api_version("apps/v1", "Deployment");
        assert_eq!(apps.group, "apps");
        assert_eq!(apps.version, "v1");
        assert_eq!(apps.api_version(), "apps/v1");
    }

    #[test]
    fn test_normalize_ignores_version() {
        let v1 = ObjectRef::new(
            GroupVersionKind::new("autoscaling", "v1", "HorizontalPodAutoscaler"),
            "app",
            "web",
        );
        let v2 = ObjectRef::new(
            GroupVersionKind::new("autoscaling", "v2", "HorizontalPodAutoscaler"),
            "app",
            "web",
        );

        assert_ne!(v1, v2);
        assert_eq!(normalize(&v1), normalize(&v2));
        assert_eq!(normalize(&v1).gvk.version, "");
    }

    #[test]
    fn test_namespace_detection() {
        assert!(ObjectRef::namespace("app").is_namespace());

        let other_version = ObjectRef::new(GroupVersionKind::new("", "v2", "Namespace"), "", "x");
        assert!(other_version.is_namespace());

        let crd_namespace = ObjectRef::new(
            GroupVersionKind::new("example.com", "v1", "Namespace"),
            "",
            "x",
        );
        assert!(!crd_namespace.is_namespace());
    }

    #[test]
    fn test_display() {
        assert_eq!(ObjectRef::namespace("app").to_string(), "Namespace/app");

        let deployment = ObjectRef::new(GroupVersionKind::new("apps", "v1", "Deployment"), "app", "web");
        assert_eq!(deployment.to_string(), "Deployment/app/web");
        assert_eq!(deployment.group_kind().to_string(), "Deployment.apps");
    }

    #[test]
    fn test_api_resource_identifier_matching() {
        let deployments = ApiResource::new("apps", "v1", "Deployment", "deployments", true);
        assert!(deployments.matches_identifier("Deployment"));
        assert!(deployments.matches_identifier("deployments"));
        assert!(deployments.matches_identifier("apps"));
        assert!(!deployments.matches_identifier("Service"));
    }

    #[test]
    fn test_object_ref_serde_shape() {
        let reference = ObjectRef::new(GroupVersionKind::new("apps", "v1", "Deployment"), "app", "web");
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["group"], "apps");
        assert_eq!(json["kind"], "Deployment");
        assert_eq!(json["namespace"], "app");

        let parsed: ObjectRef =
            serde_json::from_str(r#"{"kind":"Namespace","version":"v1","name":"app"}"#).unwrap();
        assert_eq!(parsed, ObjectRef::namespace("app"));
    }
}
