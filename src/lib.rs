//! # groupsync
//!
//! Replicates a keyed group record across a fixed set of independent
//! nodes, each serving the same CRUD HTTP API over its own store:
//! - Fan-out of create/delete to every node, bounded concurrency
//! - Bounded retry with exponential backoff per remote call
//! - Compensating rollback on the nodes that succeeded when any node fails
//!
//! This is best-effort: no distributed transaction, no consensus, and no
//! locking between overlapping calls on the same group id.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           ClusterCoordinator             │
//! │   fan-out → classify → compensate        │
//! └───────────┬──────────────────────────────┘
//!             │ HTTP (retry + backoff)
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Node 1     │   │ Node 2     │   │ Node 3       │
//! │ /v1/group  │   │ /v1/group  │   │ /v1/group    │
//! │ (RocksDB)  │   │ (RocksDB)  │   │ (RocksDB)    │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a node
//! ```bash
//! groupsync-node --id node-1 --bind 0.0.0.0:5001 --db ./node1-data
//! ```
//!
//! ### Use the CLI
//! ```bash
//! groupsync --nodes http://localhost:5001,http://localhost:5002 create '{"groupId": "1"}'
//! groupsync delete '{"groupId": "1"}'
//! groupsync get 1
//! groupsync reset
//! ```

pub mod common;
pub mod coordinator;
pub mod node;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use coordinator::{BackoffRetrier, ClusterCoordinator, RemoteEndpoint};
pub use node::NodeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
