//! Node binary

use anyhow::Result;
use clap::Parser;
use groupsync::common::{init_tracing, Config};
use groupsync::NodeServer;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "groupsync-node")]
#[command(about = "groupsync node - serves group records from a local store")]
#[command(version)]
struct Args {
    /// Config file (defaults to $GROUPSYNC_CONFIG or ./groupsync.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node ID stamped on every stored record
    #[arg(short, long)]
    id: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// RocksDB directory (in-memory store when omitted)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // CLI has priority over file and environment
    if let Some(id) = args.id {
        config.node.node_id = id;
    }
    if let Some(bind) = args.bind {
        config.node.bind_addr = bind;
    }
    if let Some(db) = args.db {
        config.node.db_path = Some(db);
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(file) = args.log_file {
        config.log_file = Some(file);
    }
    config.validate()?;

    init_tracing(&config.log_level, config.log_file.as_deref())?;

    if let Some(db) = &config.node.db_path {
        tokio::fs::create_dir_all(db).await?;
    }

    NodeServer::new(config.node).serve().await?;

    Ok(())
}
