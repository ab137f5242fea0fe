//! Node operations: fetch, create, update, delete, complete.
//!
//! Every mutating call is followed by a `get` on the affected node, so the
//! caller always receives a fresh snapshot assembled from the list endpoint
//! (children) and the detail endpoint (attributes).

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::WorkflowyClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpTransport};
use crate::types::{CreateNode, Node, Position, ROOT_NODE_ID};

/// Node-oriented API, borrowed from a `WorkflowyClient`.
pub struct Nodes<'a, T> {
    client: &'a WorkflowyClient<T>,
}

impl<'a, T: HttpTransport> Nodes<'a, T> {
    pub(crate) fn new(client: &'a WorkflowyClient<T>) -> Self {
        Self { client }
    }

    pub fn get_root(&self) -> Result<Node> {
        self.get(ROOT_NODE_ID)
    }

    /// Fetch a node with its direct children.
    ///
    /// `node_id` may be a node id, a target key such as `inbox`, or
    /// `ROOT_NODE_ID`. Failing to list children is an error; failing to load
    /// the node's own attributes is not, and falls back to a synthesized
    /// name.
    pub fn get(&self, node_id: &str) -> Result<Node> {
        let listing = self.client.request(
            HttpMethod::Get,
            "nodes",
            Some(&object(json!({ "parent_id": node_id }))),
        )?;
        let children = Node::list_from_wire(listing.get("nodes"), "nodes")?;

        let details = if node_id == ROOT_NODE_ID {
            None
        } else {
            self.details(node_id).unwrap_or_else(|err| {
                debug!(node_id, error = %err, "node details unavailable, using defaults");
                None
            })
        };
        let mut node = match details {
            Some(node) => node,
            None => Node::from_wire(&Value::Object(default_details(node_id)))?,
        };
        node.children = children;
        Ok(node)
    }

    /// The node's own attributes. A malformed record is an error here so
    /// that `get` can fall back to defaults.
    fn details(&self, node_id: &str) -> Result<Option<Node>> {
        let mut response = self
            .client
            .request(HttpMethod::Get, &node_path(node_id, None), None)?;
        match response.remove("node") {
            Some(Value::Object(mut node)) => {
                node.remove("children");
                Node::from_wire(&Value::Object(node)).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Create a node under `parent_id` and return it as the server stores it.
    ///
    /// A `priority` of zero places the node first among its siblings; any
    /// other value appends it.
    pub fn create(
        &self,
        parent_id: &str,
        name: &str,
        priority: i64,
        note: Option<&str>,
    ) -> Result<Node> {
        let payload = CreateNode {
            parent_id: parent_id.to_string(),
            name: name.to_string(),
            note: note.map(str::to_string),
            position: Position::from_priority(priority),
        };
        let response =
            self.client
                .request(HttpMethod::Post, "nodes", Some(&to_object(&payload)?))?;

        match response.get("item_id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => self.get(id),
            _ => Err(ApiError::MissingItemId),
        }
    }

    /// Apply a partial attribute set, e.g. an `UpdateNode` or a raw `Map`.
    pub fn update<A: Serialize + ?Sized>(&self, id: &str, attributes: &A) -> Result<Node> {
        self.client.request(
            HttpMethod::Post,
            &node_path(id, None),
            Some(&to_object(attributes)?),
        )?;
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.client
            .request(HttpMethod::Delete, &node_path(id, None), None)?;
        Ok(())
    }

    pub fn check(&self, id: &str) -> Result<Node> {
        self.client
            .request(HttpMethod::Post, &node_path(id, Some("complete")), None)?;
        self.get(id)
    }

    pub fn uncheck(&self, id: &str) -> Result<Node> {
        self.client
            .request(HttpMethod::Post, &node_path(id, Some("uncomplete")), None)?;
        self.get(id)
    }
}

/// Bytes escaped inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `nodes/<id>` or `nodes/<id>/<action>`, with the id escaped as one segment.
fn node_path(id: &str, action: Option<&str>) -> String {
    let id = utf8_percent_encode(id, PATH_SEGMENT);
    match action {
        Some(action) => format!("nodes/{id}/{action}"),
        None => format!("nodes/{id}"),
    }
}

/// Attributes used when the detail endpoint cannot describe a node.
fn default_details(node_id: &str) -> Map<String, Value> {
    let name = if node_id == ROOT_NODE_ID {
        "Root".to_string()
    } else {
        capitalize(node_id)
    };
    object(json!({ "id": node_id, "name": name }))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn to_object<A: Serialize + ?Sized>(attributes: &A) -> Result<Map<String, Value>> {
    match serde_json::to_value(attributes).map_err(ApiError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::UnexpectedShape(format!(
            "node attributes must be a JSON object, got {other}"
        ))),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
