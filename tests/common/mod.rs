//! Shared helpers: in-process nodes on ephemeral ports

#![allow(dead_code)]

use axum::Router;
use groupsync::coordinator::{BackoffRetrier, ClusterCoordinator, RemoteEndpoint};
use groupsync::node::{create_router, MemStore, NodeState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const RESOURCE_PATH: &str = "v1/group";

pub struct TestNode {
    pub url: String,
    pub node_id: String,
    pub store: Arc<MemStore>,
}

/// Serve `router` on 127.0.0.1:0 and return its base URL
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub async fn spawn_node(node_id: &str) -> TestNode {
    let store = Arc::new(MemStore::new());
    let router = create_router(NodeState {
        store: store.clone(),
        node_id: node_id.to_string(),
        port: 0,
    });
    let url = spawn_router(router).await;
    TestNode {
        url,
        node_id: node_id.to_string(),
        store,
    }
}

/// A URL nothing listens on
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn fast_retrier() -> BackoffRetrier {
    BackoffRetrier::new(3, Duration::from_millis(5))
}

pub fn endpoint(url: &str) -> RemoteEndpoint {
    RemoteEndpoint::new(url, RESOURCE_PATH)
        .unwrap()
        .with_retrier(fast_retrier())
}

pub fn cluster_of(urls: &[&str]) -> ClusterCoordinator {
    ClusterCoordinator::new(urls.iter().map(|u| endpoint(u)).collect())
}

pub async fn spawn_cluster(n: usize) -> (Vec<TestNode>, ClusterCoordinator) {
    let mut nodes = Vec::new();
    for i in 1..=n {
        nodes.push(spawn_node(&format!("node-{}", i)).await);
    }
    let urls: Vec<&str> = nodes.iter().map(|n| n.url.as_str()).collect();
    let cluster = cluster_of(&urls);
    (nodes, cluster)
}
