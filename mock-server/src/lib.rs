//! In-memory Workflowy API for tests and local development.
//!
//! Serves the `/api/v1` node and target endpoints over a tree held in a
//! `RwLock`. Ids resolve as `None` (the root), a registered target key, or a
//! node id.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ROOT_ID: &str = "None";

#[derive(Clone, Debug)]
pub struct StoredNode {
    pub id: String,
    pub name: String,
    pub note: Option<String>,
    pub layout_mode: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
    pub completed_at: Option<i64>,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct StoredTarget {
    pub key: String,
    pub kind: String,
    pub name: String,
    /// `None` points at the root.
    pub node_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: HashMap<String, StoredNode>,
    root_children: Vec<String>,
    targets: Vec<StoredTarget>,
}

/// Where an id points once targets are resolved.
enum Resolved {
    Root,
    Node(String),
}

impl Tree {
    fn resolve(&self, id: &str) -> Option<Resolved> {
        if id == ROOT_ID {
            return Some(Resolved::Root);
        }
        if let Some(target) = self.targets.iter().find(|t| t.key == id) {
            return match &target.node_id {
                None => Some(Resolved::Root),
                Some(node_id) => self
                    .nodes
                    .contains_key(node_id)
                    .then(|| Resolved::Node(node_id.clone())),
            };
        }
        self.nodes
            .contains_key(id)
            .then(|| Resolved::Node(id.to_string()))
    }

    /// Resolve `id` to a stored node. The root has no record of its own.
    fn resolve_node(&self, id: &str) -> Result<String, ApiFailure> {
        match self.resolve(id) {
            Some(Resolved::Node(node_id)) => Ok(node_id),
            Some(Resolved::Root) | None => Err(ApiFailure::not_found()),
        }
    }

    fn children_of(&self, parent: &Resolved) -> &[String] {
        match parent {
            Resolved::Root => &self.root_children,
            Resolved::Node(id) => self
                .nodes
                .get(id)
                .map(|n| n.children.as_slice())
                .unwrap_or_default(),
        }
    }

    fn children_mut(&mut self, parent: &Resolved) -> Option<&mut Vec<String>> {
        match parent {
            Resolved::Root => Some(&mut self.root_children),
            Resolved::Node(id) => self.nodes.get_mut(id).map(|n| &mut n.children),
        }
    }

    /// Position of `id` among its siblings.
    fn priority(&self, node: &StoredNode) -> usize {
        let siblings = match &node.parent {
            None => &self.root_children,
            Some(parent) => match self.nodes.get(parent) {
                Some(p) => &p.children,
                None => return 0,
            },
        };
        siblings.iter().position(|c| *c == node.id).unwrap_or(0)
    }

    fn to_json(&self, node: &StoredNode) -> Value {
        json!({
            "id": node.id,
            "name": node.name,
            "note": node.note,
            "priority": self.priority(node),
            "completed": node.completed_at.is_some(),
            "completedAt": node.completed_at,
            "createdAt": node.created_at,
            "modifiedAt": node.modified_at,
            "data": { "layoutMode": node.layout_mode },
        })
    }

    fn insert(&mut self, parent: &Resolved, name: String, note: Option<String>, top: bool) -> String {
        let now = chrono::Utc::now().timestamp();
        let id = Uuid::new_v4().to_string();
        let parent_id = match parent {
            Resolved::Root => None,
            Resolved::Node(id) => Some(id.clone()),
        };
        self.nodes.insert(
            id.clone(),
            StoredNode {
                id: id.clone(),
                name,
                note,
                layout_mode: None,
                created_at: now,
                modified_at: now,
                completed_at: None,
                parent: parent_id,
                children: Vec::new(),
            },
        );
        if let Some(siblings) = self.children_mut(parent) {
            if top {
                siblings.insert(0, id.clone());
            } else {
                siblings.push(id.clone());
            }
        }
        id
    }

    fn remove_subtree(&mut self, id: &str) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.remove_subtree(&child);
            }
        }
    }
}

impl Tree {
    /// Empty tree with a `home` target pointing at the root.
    pub fn new() -> Self {
        Tree {
            targets: vec![StoredTarget {
                key: "home".to_string(),
                kind: "system".to_string(),
                name: "Home".to_string(),
                node_id: None,
            }],
            ..Tree::default()
        }
    }

    /// Add a top-level node and a target shortcut to it.
    pub fn with_target(mut self, key: &str, kind: &str, name: &str) -> Self {
        let node_id = self.insert(&Resolved::Root, name.to_string(), None, false);
        self.targets.push(StoredTarget {
            key: key.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            node_id: Some(node_id),
        });
        self
    }
}

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    tree: Arc<RwLock<Tree>>,
}

impl AppState {
    pub fn new(api_key: &str, tree: Tree) -> Self {
        Self {
            api_key: Arc::from(api_key),
            tree: Arc::new(RwLock::new(tree)),
        }
    }
}

/// Error response in the API's JSON shape.
pub struct ApiFailure {
    status: StatusCode,
    body: Value,
}

impl ApiFailure {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({ "error": "Node not found" }),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message.into() }),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: json!({ "message": "Unauthorized" }),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiFailure>;

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/nodes", get(list_nodes).post(create_node))
        .route(
            "/nodes/{id}",
            get(get_node).post(update_node).delete(delete_node),
        )
        .route("/nodes/{id}/complete", post(complete_node))
        .route("/nodes/{id}/uncomplete", post(uncomplete_node))
        .route("/targets", get(list_targets));
    Router::new().nest("/api/v1", api).with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let expected = format!("Bearer {}", state.api_key);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(ApiFailure::unauthorized()),
    }
}

/// Request bodies may be empty; treat that as `{}`.
fn json_object(body: &Bytes) -> Result<Map<String, Value>, ApiFailure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiFailure::bad_request("Body must be a JSON object")),
        Err(e) => Err(ApiFailure::bad_request(format!("Invalid JSON: {e}"))),
    }
}

fn optional_string(map: &Map<String, Value>, field: &str) -> Result<Option<String>, ApiFailure> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ApiFailure::bad_request(format!("`{field}` must be a string"))),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub parent_id: Option<String>,
}

async fn list_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let tree = state.tree.read().await;
    let parent_id = query.parent_id.as_deref().unwrap_or(ROOT_ID);
    let parent = tree.resolve(parent_id).ok_or_else(ApiFailure::not_found)?;
    let nodes: Vec<Value> = tree
        .children_of(&parent)
        .iter()
        .filter_map(|id| tree.nodes.get(id))
        .map(|node| tree.to_json(node))
        .collect();
    Ok(Json(json!({ "nodes": nodes })))
}

async fn get_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let tree = state.tree.read().await;
    let id = tree.resolve_node(&id)?;
    let node = tree.nodes.get(&id).ok_or_else(ApiFailure::not_found)?;
    Ok(Json(json!({ "node": tree.to_json(node) })))
}

async fn create_node(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    authorize(&state, &headers)?;
    let input = json_object(&body)?;
    let name = optional_string(&input, "name")?
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiFailure::bad_request("`name` is required"))?;
    let note = optional_string(&input, "note")?;
    let parent_id = optional_string(&input, "parent_id")?.unwrap_or_else(|| ROOT_ID.to_string());
    let top = match optional_string(&input, "position")?.as_deref() {
        None | Some("bottom") => false,
        Some("top") => true,
        Some(other) => {
            return Err(ApiFailure::bad_request(format!("unknown position `{other}`")))
        }
    };

    let mut tree = state.tree.write().await;
    let parent = tree.resolve(&parent_id).ok_or_else(ApiFailure::not_found)?;
    let id = tree.insert(&parent, name, note, top);
    tracing::debug!(%id, parent = %parent_id, "created node");
    Ok(Json(json!({ "item_id": id })))
}

async fn update_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &headers)?;
    let input = json_object(&body)?;
    let name = optional_string(&input, "name")?;
    let note = optional_string(&input, "note")?;
    let layout_mode = optional_string(&input, "layoutMode")?;

    let mut tree = state.tree.write().await;
    let id = tree.resolve_node(&id)?;
    let node = tree.nodes.get_mut(&id).ok_or_else(ApiFailure::not_found)?;
    if let Some(name) = name {
        node.name = name;
    }
    if input.contains_key("note") {
        node.note = note;
    }
    if input.contains_key("layoutMode") {
        node.layout_mode = layout_mode;
    }
    node.modified_at = chrono::Utc::now().timestamp();
    Ok(Json(json!({ "status": "ok" })))
}

async fn delete_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let mut tree = state.tree.write().await;
    let id = tree.resolve_node(&id)?;
    let parent = tree
        .nodes
        .get(&id)
        .ok_or_else(ApiFailure::not_found)?
        .parent
        .clone();
    let siblings = match parent {
        None => Some(&mut tree.root_children),
        Some(parent) => tree.nodes.get_mut(&parent).map(|p| &mut p.children),
    };
    if let Some(siblings) = siblings {
        siblings.retain(|child| *child != id);
    }
    tree.remove_subtree(&id);
    Ok(Json(json!({ "status": "ok" })))
}

async fn set_completed(state: AppState, headers: HeaderMap, id: String, completed: bool) -> ApiResult {
    authorize(&state, &headers)?;
    let mut tree = state.tree.write().await;
    let id = tree.resolve_node(&id)?;
    let node = tree.nodes.get_mut(&id).ok_or_else(ApiFailure::not_found)?;
    let now = chrono::Utc::now().timestamp();
    node.completed_at = completed.then_some(now);
    node.modified_at = now;
    Ok(Json(json!({ "status": "ok" })))
}

async fn complete_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    set_completed(state, headers, id, true).await
}

async fn uncomplete_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    set_completed(state, headers, id, false).await
}

async fn list_targets(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    authorize(&state, &headers)?;
    let tree = state.tree.read().await;
    let targets: Vec<Value> = tree
        .targets
        .iter()
        .map(|t| json!({ "key": t.key, "type": t.kind, "name": t.name }))
        .collect();
    Ok(Json(json!({ "targets": targets })))
}
