//! Compensating rollback after a partial cluster failure
//!
//! The inverse operation goes only to the nodes that succeeded. A failed
//! compensating call is logged and left alone: that node stays out of step
//! with the rest of the cluster.

use crate::common::{group_id_of, Error};
use crate::coordinator::cluster::{fan_out, Operation};
use crate::coordinator::endpoint::RemoteEndpoint;
use serde_json::Value;
use tracing::{error, info};

/// What a compensation pass did
#[derive(Debug)]
pub struct CompensationReport {
    /// Inverse of the operation that partially failed
    pub action: Operation,
    pub restored: Vec<String>,
    /// Nodes whose compensating call failed; not retried further
    pub unresolved: Vec<(String, Error)>,
}

impl CompensationReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompensationEngine {
    max_workers: usize,
}

impl CompensationEngine {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Undo `failed_op` on `succeeded`.
    pub async fn compensate(
        &self,
        failed_op: Operation,
        data: &Value,
        succeeded: &[&RemoteEndpoint],
    ) -> CompensationReport {
        let action = failed_op.inverse();
        let targets: Vec<&str> = succeeded.iter().map(|e| e.base_url()).collect();
        info!(
            group_id = group_id_of(data),
            nodes = ?targets,
            "Start rollback of {}: issuing {}", failed_op, action
        );

        let outcomes = fan_out(action, succeeded.iter().copied(), data, self.max_workers).await;

        let mut report = CompensationReport {
            action,
            restored: Vec::new(),
            unresolved: Vec::new(),
        };
        for (_, outcome) in outcomes {
            match outcome.result {
                Ok(()) => report.restored.push(outcome.endpoint),
                Err(e) => {
                    error!(
                        endpoint = %outcome.endpoint,
                        group_id = group_id_of(data),
                        error = %e,
                        "Failed to roll back {} on node; node left inconsistent", failed_op
                    );
                    report.unresolved.push((outcome.endpoint, e));
                }
            }
        }

        info!(
            group_id = group_id_of(data),
            nodes = ?targets,
            restored = report.restored.len(),
            unresolved = report.unresolved.len(),
            "End rollback of {}", failed_op
        );
        report
    }
}
