//! kprune pruning core
//!
//! Decides which live objects a deployment tool may delete and deletes them
//! in a safe order.
//!
//! - `safety`: per-object eligibility rules
//! - `selector`: phase-ordered selection over the live object list
//! - `executor`: two-pass concurrent deletion with a bounded worker pool
//! - `report`: aggregated deletion outcomes
//!
//! ```no_run
//! use std::sync::Arc;
//! use common::cluster::InMemoryCluster;
//! use common::config::PruneConfig;
//! use pruner::Pruner;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pruner = Pruner::new(Arc::new(InMemoryCluster::default()), PruneConfig::default());
//! let report = pruner.prune(false, &[]).await?;
//! report.log_summary();
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod exclusion;
pub mod executor;
pub mod metrics;
pub mod orchestrator;
pub mod phases;
pub mod report;
pub mod safety;
pub mod selector;

// Re-export commonly used types
pub use cancel::{CancelHandle, CancelSignal, cancellation};
pub use exclusion::ExclusionSet;
pub use executor::{DEFAULT_CONCURRENCY, DeletionExecutor};
pub use metrics::{MetricsSummary, PruneMetrics};
pub use orchestrator::Pruner;
pub use phases::{Phase, PhaseTable};
pub use report::{DeletionReport, ReportAccumulator, ReportEntry};
pub use safety::{Ineligible, SafetyFilter};
pub use selector::{PhaseSelector, SelectionError};
