use common::k8s::{ApiResource, GroupVersionKind, LiveObject};

/// Field manager the default configuration prunes for
pub const MANAGER: &str = "kprune";

/// Mark an object as applied by the pruning tool
pub fn managed(object: LiveObject) -> LiveObject {
    object.with_manager(MANAGER)
}

pub fn namespace(name: &str) -> LiveObject {
    LiveObject::new(&GroupVersionKind::new("", "v1", "Namespace"), "", name)
}

pub fn config_map(namespace: &str, name: &str) -> LiveObject {
    LiveObject::new(&GroupVersionKind::new("", "v1", "ConfigMap"), namespace, name)
}

pub fn service(namespace: &str, name: &str) -> LiveObject {
    LiveObject::new(&GroupVersionKind::new("", "v1", "Service"), namespace, name)
}

pub fn deployment(namespace: &str, name: &str) -> LiveObject {
    LiveObject::new(&GroupVersionKind::new("apps", "v1", "Deployment"), namespace, name)
}

pub fn cluster_role(name: &str) -> LiveObject {
    LiveObject::new(
        &GroupVersionKind::new("rbac.authorization.k8s.io", "v1", "ClusterRole"),
        "",
        name,
    )
}

pub fn prometheus_rule(namespace: &str, name: &str) -> LiveObject {
    LiveObject::new(
        &GroupVersionKind::new("monitoring.coreos.com", "v1", "PrometheusRule"),
        namespace,
        name,
    )
}

/// Builtin discovery data plus the Prometheus operator's rule type
pub fn operator_resources() -> Vec<ApiResource> {
    let mut resources = ApiResource::builtin();
    resources.push(ApiResource::new(
        "monitoring.coreos.com",
        "v1",
        "PrometheusRule",
        "prometheusrules",
        true,
    ));
    resources
}
