//! Node service
//!
//! One independent replica: a CRUD HTTP API over its own local store.
//! Nodes know nothing about each other; the coordinator drives them.

pub mod http;
pub mod request_trace;
pub mod server;
pub mod store;

pub use http::{create_router, NodeState};
pub use server::NodeServer;
pub use store::{open_store, GroupStore, MemStore, RocksStore};
