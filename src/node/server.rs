//! Node server

use crate::common::{NodeConfig, Result};
use crate::node::http::{create_router, NodeState};
use crate::node::store::open_store;
use tokio::net::TcpListener;

pub struct NodeServer {
    config: NodeConfig,
}

impl NodeServer {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Bind the configured address and serve until ctrl-c
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;

        tracing::info!("Starting node: {}", self.config.node_id);
        tracing::info!("  HTTP API: {}", local_addr);
        match &self.config.db_path {
            Some(path) => tracing::info!("  DB path: {}", path.display()),
            None => tracing::info!("  DB path: <in-memory>"),
        }

        let store = open_store(self.config.db_path.as_deref())?;
        let router = create_router(NodeState {
            store,
            node_id: self.config.node_id.clone(),
            port: local_addr.port(),
        });

        tracing::info!("✓ Node ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Node {} stopped", self.config.node_id);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
