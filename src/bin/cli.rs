//! CLI for cluster operations

use clap::{Parser, Subcommand};
use groupsync::common::{init_tracing, Config};
use groupsync::coordinator::{ClusterCoordinator, Operation};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "groupsync")]
#[command(about = "Create or delete group records across a groupsync cluster")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $GROUPSYNC_CONFIG or ./groupsync.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node base URLs (comma-separated), overriding the config
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<String>,

    /// Concurrent calls per fan-out round
    #[arg(long)]
    max_workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a group on every node, e.g. '{"groupId": "1"}'
    Create {
        /// JSON payload
        data: String,
    },

    /// Delete a group from every node, e.g. '{"groupId": "1"}'
    Delete {
        /// JSON payload
        data: String,
    },

    /// Show each node's copy of a group
    Get {
        /// Group ID
        group_id: String,
    },

    /// Remove every group from every node
    Reset,
}

fn parse_payload(data: &str) -> Option<Value> {
    match serde_json::from_str(data) {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("Invalid JSON data provided.");
            None
        }
    }
}

/// Parse `data` and fan `op` out. `None` means the payload was not JSON and
/// no node was contacted.
async fn run_mutation(cluster: &ClusterCoordinator, op: Operation, data: &str) -> Option<bool> {
    let data = parse_payload(data)?;
    Some(cluster.execute(op, &data).await.is_success())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if !cli.nodes.is_empty() {
        config.cluster.nodes = cli.nodes;
    }
    if let Some(max_workers) = cli.max_workers {
        config.cluster.max_workers = max_workers;
    }

    init_tracing(&config.log_level, config.log_file.as_deref())?;

    let cluster = ClusterCoordinator::from_config(&config.cluster)?;

    match cli.command {
        Commands::Create { data } => match run_mutation(&cluster, Operation::Create, &data).await {
            Some(true) => println!("create: ok"),
            Some(false) => {
                println!("create: failed (rolled back)");
                return Ok(ExitCode::FAILURE);
            }
            None => return Ok(ExitCode::FAILURE),
        },

        Commands::Delete { data } => match run_mutation(&cluster, Operation::Delete, &data).await {
            Some(true) => println!("delete: ok"),
            Some(false) => {
                println!("delete: failed (rolled back)");
                return Ok(ExitCode::FAILURE);
            }
            None => return Ok(ExitCode::FAILURE),
        },

        Commands::Get { group_id } => {
            for (node, group) in cluster.lookup(&group_id).await {
                match group {
                    Some(group) => println!("{}: {}", node, serde_json::to_string(&group)?),
                    None => println!("{}: not found", node),
                }
            }
        }

        Commands::Reset => {
            let cleared = cluster.reset().await;
            println!("reset: {}/{} nodes cleared", cleared, cluster.endpoints().len());
        }
    }

    Ok(ExitCode::SUCCESS)
}
