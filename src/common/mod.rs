//! Common utilities and types shared across groupsync

pub mod config;
pub mod error;
pub mod group;
pub mod logging;

pub use config::{ClusterConfig, Config, NodeConfig, REQUEST_TIMEOUT};
pub use error::{Error, Result};
pub use group::{group_id_of, validate_payload, Group, GroupList};
pub use logging::init_tracing;
