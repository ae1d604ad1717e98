//! Deletion phase tables.

use common::k8s::ApiResource;
use std::fmt;

/// One stage of the deletion order.
///
/// A phase claims every resource type whose plural name, API group or kind
/// appears in its identifier list. A phase without identifiers claims
/// everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    identifiers: Vec<String>,
}

impl Phase {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn catch_all() -> Self {
        Self {
            identifiers: Vec::new(),
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn matches(&self, resource: &ApiResource) -> bool {
        self.is_catch_all()
            || self
                .identifiers
                .iter()
                .any(|identifier| resource.matches_identifier(identifier))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_catch_all() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.identifiers.join(","))
        }
    }
}

/// Immutable, ordered list of deletion phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable {
    phases: Vec<Phase>,
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self::from_config(&common::config::default_phases())
    }
}

impl PhaseTable {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    pub fn from_config(phases: &[Vec<String>]) -> Self {
        Self::new(phases.iter().map(|phase| Phase::new(phase.clone())).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_order() {
        let table = PhaseTable::default();
        let phases: Vec<&Phase> = table.iter().collect();

        assert_eq!(phases.len(), 4);
        assert_eq!(phases[0].identifiers(), ["Namespace"]);
        assert!(phases[1].identifiers().contains(&"cert-manager.io".to_string()));
        assert_eq!(
            phases[2].identifiers(),
            ["Deployment", "StatefulSet", "DaemonSet", "Service", "Ingress"]
        );
        assert!(phases[3].is_catch_all());
    }

    #[test]
    fn test_phase_matching() {
        let certificates = ApiResource::new("cert-manager.io", "v1", "Certificate", "certificates", true);
        let deployments = ApiResource::new("apps", "v1", "Deployment", "deployments", true);
        let config_maps = ApiResource::new("", "v1", "ConfigMap", "configmaps", true);

        let operators = Phase::new(["cert-manager.io"]);
        assert!(operators.matches(&certificates));
        assert!(!operators.matches(&deployments));

        let by_plural = Phase::new(["configmaps"]);
        assert!(by_plural.matches(&config_maps));

        let everything = Phase::catch_all();
        assert!(everything.matches(&certificates));
        assert!(everything.matches(&config_maps));
    }

    #[test]
    fn test_display() {
        assert_eq!(Phase::new(["Namespace"]).to_string(), "Namespace");
        assert_eq!(Phase::new(["Deployment", "Service"]).to_string(), "Deployment,Service");
        assert_eq!(Phase::catch_all().to_string(), "*");
    }
}
