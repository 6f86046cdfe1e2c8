//! Cluster coordination
//!
//! The coordinator is responsible for:
//! - Fanning create/delete out to every node
//! - Bounded retry with exponential backoff per remote call
//! - Compensating rollback on the nodes that succeeded when any node fails

pub mod cluster;
pub mod compensation;
pub mod endpoint;
pub mod retry;

pub use cluster::{ClusterCoordinator, ClusterReport, Operation, DEFAULT_MAX_WORKERS};
pub use compensation::{CompensationEngine, CompensationReport};
pub use endpoint::{OperationOutcome, RemoteEndpoint};
pub use retry::BackoffRetrier;
