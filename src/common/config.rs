//! Configuration for groupsync components
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `GROUPSYNC__*` environment variables. Binaries apply CLI flags last.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GROUPSYNC_CONFIG";

/// Config file used when `GROUPSYNC_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "groupsync.toml";

/// Per-attempt timeout for every call a coordinator makes to a node
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings for a node service process
    #[serde(default)]
    pub node: NodeConfig,

    /// Settings for a coordinator
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log destination (stderr when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            cluster: ClusterConfig::default(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load from the file named by `GROUPSYNC_CONFIG` (or `groupsync.toml`)
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from an explicit file; a missing file falls back to defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_layered(path, None)
    }

    /// File layer at `path`, then `GROUPSYNC__*` variables. `env` replaces
    /// the process environment when given.
    fn load_layered(path: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| Error::InvalidConfig(format!("non UTF-8 path: {}", path.display())))?;

        let config: Config = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix("GROUPSYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cluster.nodes")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.node.node_id.trim().is_empty() {
            return Err(Error::InvalidConfig("node_id must not be empty".into()));
        }
        self.cluster.validate()
    }
}

/// Node service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity this node stamps on every record it stores
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Bind address for the HTTP API
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// RocksDB directory; in-memory store when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

fn default_node_id() -> String {
    "node-1".to_string()
}
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            bind_addr: default_bind_addr(),
            db_path: None,
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URLs of every cluster member
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Resource path of the group collection on each node
    #[serde(default = "default_resource_path")]
    pub resource_path: String,

    /// Upper bound on concurrent calls in one fan-out round
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Attempts per remote call, first try included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay; attempt `n` waits `delay * 2^n`
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_nodes() -> Vec<String> {
    vec![
        "http://127.0.0.1:5001".to_string(),
        "http://127.0.0.1:5002".to_string(),
        "http://127.0.0.1:5003".to_string(),
    ]
}
fn default_resource_path() -> String {
    "v1/group".to_string()
}
fn default_max_workers() -> usize {
    crate::coordinator::DEFAULT_MAX_WORKERS
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            resource_path: default_resource_path(),
            max_workers: default_max_workers(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ClusterConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::InvalidConfig("max_workers must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(Error::InvalidConfig("max_retries must be at least 1".into()));
        }
        if let Some(bad) = self
            .nodes
            .iter()
            .find(|n| !(n.starts_with("http://") || n.starts_with("https://")))
        {
            return Err(Error::InvalidConfig(format!("node URL needs a scheme: {}", bad)));
        }
        Ok(())
    }
}
