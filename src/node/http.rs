//! HTTP API of a single node
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | GET | `/v1/groups` | 200 `{nodeId, groups}` |
//! | GET | `/v1/group/{groupId}/` | 200 group, 404 if absent |
//! | POST | `/v1/group/` | 201 group, 400 invalid or duplicate |
//! | DELETE | `/v1/group/` | 200 empty, 400 invalid, 404 absent |
//! | DELETE | `/v1/groups/` | 200 empty |

use crate::common::{validate_payload, Error, Group, GroupList, Result};
use crate::node::request_trace::request_tracing_middleware;
use crate::node::store::GroupStore;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct NodeState {
    pub store: Arc<dyn GroupStore>,
    pub node_id: String,
    /// Port reported by `GET /`
    pub port: u16,
}

pub fn create_router(state: NodeState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/v1/groups", get(list_groups))
        .route("/v1/groups/", axum::routing::delete(delete_groups))
        .route("/v1/group/", post(create_group).delete(delete_group))
        .route("/v1/group/:group_id/", get(get_group))
        .layer(axum::middleware::from_fn(request_tracing_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Log a rejected request the way every route does, then hand the error back
fn rejected(route: &str, err: Error) -> Error {
    tracing::error!("{} - {}", route, err);
    err
}

fn parse_body(route: &str, body: &Bytes) -> Result<String> {
    let data: Value = serde_json::from_slice(body).map_err(|e| rejected(route, e.into()))?;
    let group_id = validate_payload(&data).map_err(|e| rejected(route, e))?;
    Ok(group_id.to_string())
}

async fn home(State(state): State<NodeState>) -> impl IntoResponse {
    Json(json!({
        "groupsync": {
            "name": "groupsync",
            "version": crate::VERSION,
            "port": state.port,
            "node_id": state.node_id,
        }
    }))
}

async fn list_groups(State(state): State<NodeState>) -> Result<Json<GroupList>> {
    let groups = state.store.list(&state.node_id)?;
    Ok(Json(GroupList {
        node_id: state.node_id,
        groups,
    }))
}

async fn get_group(
    State(state): State<NodeState>,
    Path(group_id): Path<String>,
) -> Result<Json<Group>> {
    match state.store.get(&state.node_id, &group_id)? {
        Some(group) => Ok(Json(group)),
        None => Err(rejected(
            &format!("GET /v1/group/{}/", group_id),
            Error::NotFound(group_id),
        )),
    }
}

async fn create_group(
    State(state): State<NodeState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Group>)> {
    const ROUTE: &str = "POST /v1/group/";
    let group_id = parse_body(ROUTE, &body)?;
    let group = state
        .store
        .insert(&state.node_id, &group_id)
        .map_err(|e| rejected(ROUTE, e))?;
    tracing::info!(group_id = %group.group_id, "Created group");
    Ok((StatusCode::CREATED, Json(group)))
}

async fn delete_group(State(state): State<NodeState>, body: Bytes) -> Result<StatusCode> {
    const ROUTE: &str = "DELETE /v1/group/";
    let group_id = parse_body(ROUTE, &body)?;
    state
        .store
        .remove(&state.node_id, &group_id)
        .map_err(|e| rejected(ROUTE, e))?;
    tracing::info!(group_id = %group_id, "Deleted group");
    Ok(StatusCode::OK)
}

async fn delete_groups(State(state): State<NodeState>) -> Result<StatusCode> {
    let removed = state.store.clear(&state.node_id)?;
    tracing::info!(removed, "Deleted all groups");
    Ok(StatusCode::OK)
}
