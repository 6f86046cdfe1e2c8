//! Cluster-wide create/delete with compensating rollback
//!
//! A call fans out to every endpoint, waits for all of them, then splits
//! the endpoints into succeeded and failed. Any failure triggers the
//! inverse operation on the succeeded subset.
//!
//! There is no locking across calls: two overlapping operations on the
//! same group id can interleave with each other's compensation.

use crate::common::{group_id_of, ClusterConfig, Error, Group, Result, REQUEST_TIMEOUT};
use crate::coordinator::compensation::{CompensationEngine, CompensationReport};
use crate::coordinator::endpoint::{OperationOutcome, RemoteEndpoint};
use crate::coordinator::retry::BackoffRetrier;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::fmt;
use tracing::{error, info};

/// Default bound on concurrent calls per fan-out round
pub const DEFAULT_MAX_WORKERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
}

impl Operation {
    /// The operation that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            Operation::Create => Operation::Delete,
            Operation::Delete => Operation::Create,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
        }
    }

    async fn apply(self, endpoint: &RemoteEndpoint, data: &Value) -> OperationOutcome {
        match self {
            Operation::Create => endpoint.create_record(data).await,
            Operation::Delete => endpoint.delete_record(data).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run `op` on every endpoint, at most `max_workers` at a time, and wait
/// for all of them. Results come back in completion order.
pub(crate) async fn fan_out<'a>(
    op: Operation,
    endpoints: impl IntoIterator<Item = &'a RemoteEndpoint>,
    data: &Value,
    max_workers: usize,
) -> Vec<(&'a RemoteEndpoint, OperationOutcome)> {
    stream::iter(endpoints)
        .map(|endpoint| async move { (endpoint, op.apply(endpoint, data).await) })
        .buffer_unordered(max_workers.max(1))
        .collect()
        .await
}

/// Per-node classification of one cluster operation
#[derive(Debug)]
pub struct ClusterReport {
    pub operation: Operation,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, Error)>,
    /// Present whenever at least one node failed
    pub compensation: Option<CompensationReport>,
}

impl ClusterReport {
    /// True iff every node accepted the operation
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns a fixed set of endpoints and replicates create/delete across them
#[derive(Debug)]
pub struct ClusterCoordinator {
    endpoints: Vec<RemoteEndpoint>,
    max_workers: usize,
    compensation: CompensationEngine,
}

impl ClusterCoordinator {
    pub fn new(endpoints: Vec<RemoteEndpoint>) -> Self {
        Self {
            endpoints,
            max_workers: DEFAULT_MAX_WORKERS,
            compensation: CompensationEngine::new(DEFAULT_MAX_WORKERS),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        self.max_workers = max_workers;
        self.compensation = CompensationEngine::new(max_workers);
        self
    }

    /// Build endpoints for every configured node on one shared client
    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        config.validate()?;
        if config.nodes.is_empty() {
            return Err(Error::InvalidConfig("cluster has no nodes".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;
        let retrier = BackoffRetrier::from_config(config);

        let endpoints = config
            .nodes
            .iter()
            .map(|url| {
                RemoteEndpoint::with_client(url, &config.resource_path, http.clone(), retrier)
            })
            .collect();

        Ok(Self::new(endpoints).with_max_workers(config.max_workers))
    }

    pub fn endpoints(&self) -> &[RemoteEndpoint] {
        &self.endpoints
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Create `data` on every node; `true` iff all of them accepted it.
    /// On partial failure the nodes that accepted are sent a delete.
    pub async fn create(&self, data: &Value) -> bool {
        self.execute(Operation::Create, data).await.is_success()
    }

    /// Delete `data` from every node; `true` iff all of them deleted it.
    /// On partial failure the nodes that deleted are sent a create.
    pub async fn delete(&self, data: &Value) -> bool {
        self.execute(Operation::Delete, data).await.is_success()
    }

    /// Run `op` cluster-wide and compensate on partial failure.
    pub async fn execute(&self, op: Operation, data: &Value) -> ClusterReport {
        let outcomes = fan_out(op, &self.endpoints, data, self.max_workers).await;

        let mut succeeded_nodes = Vec::new();
        let mut report = ClusterReport {
            operation: op,
            succeeded: Vec::new(),
            failed: Vec::new(),
            compensation: None,
        };

        for (endpoint, outcome) in outcomes {
            match outcome.result {
                Ok(()) => {
                    succeeded_nodes.push(endpoint);
                    report.succeeded.push(outcome.endpoint);
                }
                Err(e) => {
                    error!(
                        endpoint = %outcome.endpoint,
                        group_id = group_id_of(data),
                        "Failed to {} object on node", op
                    );
                    report.failed.push((outcome.endpoint, e));
                }
            }
        }

        if !report.failed.is_empty() {
            let compensation = self
                .compensation
                .compensate(op, data, &succeeded_nodes)
                .await;
            report.compensation = Some(compensation);
        }

        report
    }

    /// Clear every node's records (reset tooling). Returns how many nodes
    /// confirmed the clear.
    pub async fn reset(&self) -> usize {
        let cleared: Vec<bool> = stream::iter(&self.endpoints)
            .map(|endpoint| endpoint.delete_all())
            .buffer_unordered(self.max_workers)
            .collect()
            .await;
        let ok = cleared.iter().filter(|c| **c).count();
        info!(cleared = ok, nodes = self.endpoints.len(), "cluster reset");
        ok
    }

    /// Each node's view of `id`, in endpoint order
    pub async fn lookup(&self, id: &str) -> Vec<(String, Option<Group>)> {
        stream::iter(&self.endpoints)
            .map(|endpoint| async move {
                (endpoint.base_url().to_string(), endpoint.get_record(id).await)
            })
            .buffered(self.max_workers)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_is_involution() {
        assert_eq!(Operation::Create.inverse(), Operation::Delete);
        assert_eq!(Operation::Delete.inverse(), Operation::Create);
        for op in [Operation::Create, Operation::Delete] {
            assert_eq!(op.inverse().inverse(), op);
        }
    }

    #[test]
    fn test_from_config() {
        let config = ClusterConfig {
            nodes: vec!["http://a:1".into(), "http://b:2/".into()],
            max_workers: 2,
            ..Default::default()
        };
        let cluster = ClusterCoordinator::from_config(&config).unwrap();
        assert_eq!(cluster.max_workers(), 2);
        assert_eq!(cluster.endpoints().len(), 2);
        assert_eq!(cluster.endpoints()[1].base_url(), "http://b:2");
        assert_eq!(cluster.endpoints()[0].retrier().max_attempts(), 3);
    }

    #[test]
    fn test_from_config_rejects_empty_cluster() {
        let config = ClusterConfig {
            nodes: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            ClusterCoordinator::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_workers_never_zero() {
        let cluster = ClusterCoordinator::new(Vec::new()).with_max_workers(0);
        assert_eq!(cluster.max_workers(), 1);
    }

    #[tokio::test]
    async fn test_empty_cluster_trivially_succeeds() {
        let cluster = ClusterCoordinator::new(Vec::new());
        let report = cluster
            .execute(Operation::Create, &serde_json::json!({"groupId": "1"}))
            .await;
        assert!(report.is_success());
        assert!(report.compensation.is_none());
    }
}
