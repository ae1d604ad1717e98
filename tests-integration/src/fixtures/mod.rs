//! Test fixtures for integration testing
//!
//! Object builders for the shapes a deployment tool leaves in a cluster and
//! a ready-made cluster context around an in-memory cluster.

mod cluster_context;
mod objects;

pub use cluster_context::ClusterTestContext;
pub use objects::{
    MANAGER, cluster_role, config_map, deployment, managed, namespace, operator_resources,
    prometheus_rule, service,
};
