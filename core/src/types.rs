//! Domain values for the Workflowy API: nodes, targets, layout modes, and
//! the request payloads that create or modify nodes.
//!
//! # Design
//! `Node` and `Target` are immutable snapshots rebuilt from every response.
//! Node decoding is hand-written over `serde_json::Value` rather than derived
//! because the server omits fields freely, sends timestamps as numbers or
//! strings, and may add layout modes this crate does not know yet. Missing
//! optional fields take documented defaults instead of failing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ApiError;

/// Id the API uses for the top of the outline.
pub const ROOT_NODE_ID: &str = "None";

/// Display mode of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutMode {
    #[serde(rename = "bullets")]
    Bullets,
    #[serde(rename = "board")]
    Board,
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "h1")]
    H1,
    #[serde(rename = "h2")]
    H2,
    #[serde(rename = "h3")]
    H3,
    #[serde(rename = "code-block")]
    CodeBlock,
    #[serde(rename = "quote-block")]
    QuoteBlock,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 8] = [
        LayoutMode::Bullets,
        LayoutMode::Board,
        LayoutMode::Todo,
        LayoutMode::H1,
        LayoutMode::H2,
        LayoutMode::H3,
        LayoutMode::CodeBlock,
        LayoutMode::QuoteBlock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Bullets => "bullets",
            LayoutMode::Board => "board",
            LayoutMode::Todo => "todo",
            LayoutMode::H1 => "h1",
            LayoutMode::H2 => "h2",
            LayoutMode::H3 => "h3",
            LayoutMode::CodeBlock => "code-block",
            LayoutMode::QuoteBlock => "quote-block",
        }
    }

    /// Unknown tags yield `None` so modes added server-side never break decoding.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == tag)
    }
}

impl FromStr for LayoutMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ApiError::UnexpectedShape(format!("unknown layout mode `{s}`")))
    }
}

/// One outline item and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub note: Option<String>,
    pub is_completed: bool,
    pub layout_mode: Option<LayoutMode>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Present iff `is_completed`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Display order.
    pub children: Vec<Node>,
    pub priority: i64,
}

impl Node {
    /// Decode a wire node, recursing into `children`.
    pub fn from_wire(value: &Value) -> Result<Self, ApiError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ApiError::UnexpectedShape(format!("expected a node object, got {value}")))?;

        let now = Utc::now();
        let completed_at = integer_field(obj, "completedAt")?.filter(|secs| *secs != 0).and_then(to_datetime);

        let layout_mode = obj
            .get("data")
            .and_then(|data| data.get("layoutMode"))
            .or_else(|| obj.get("layoutMode"))
            .and_then(Value::as_str)
            .and_then(LayoutMode::parse);

        let children = Node::list_from_wire(obj.get("children"), "children")?;

        Ok(Node {
            id: string_field(obj, "id")?.unwrap_or_else(|| "unknown".to_string()),
            name: string_field(obj, "name")?.unwrap_or_default(),
            note: string_field(obj, "note")?.filter(|note| !note.is_empty()),
            is_completed: completed_at.is_some(),
            layout_mode,
            created_at: integer_field(obj, "createdAt")?.and_then(to_datetime).unwrap_or(now),
            modified_at: integer_field(obj, "modifiedAt")?.and_then(to_datetime).unwrap_or(now),
            completed_at,
            children,
            priority: integer_field(obj, "priority")?.unwrap_or(0),
        })
    }

    /// Decode an optional array of nodes; absent or null is empty.
    pub(crate) fn list_from_wire(value: Option<&Value>, field: &str) -> Result<Vec<Node>, ApiError> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(Node::from_wire).collect(),
            Some(other) => Err(ApiError::UnexpectedShape(format!(
                "field `{field}` must be an array of nodes, got {other}"
            ))),
        }
    }

    /// Encode back to the wire shape, timestamps as unix seconds. The layout
    /// mode is written both at the top level and under `data`.
    pub fn to_wire(&self) -> Value {
        let layout_mode = self.layout_mode.map(LayoutMode::as_str);
        json!({
            "id": self.id,
            "name": self.name,
            "note": self.note,
            "isCompleted": self.is_completed,
            "layoutMode": layout_mode,
            "data": { "layoutMode": layout_mode },
            "createdAt": self.created_at.timestamp(),
            "modifiedAt": self.modified_at.timestamp(),
            "completedAt": self.completed_at.map(|at| at.timestamp()),
            "priority": self.priority,
            "children": self.children.iter().map(Node::to_wire).collect::<Vec<_>>(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_NODE_ID
    }

    /// First direct child with the given name.
    pub fn child_named(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name == name)
    }
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, ApiError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ApiError::UnexpectedShape(format!(
            "node field `{field}` must be a string, got {other}"
        ))),
    }
}

/// Integer field that may arrive as a number, a float, or a numeric string.
fn integer_field(obj: &Map<String, Value>, field: &str) -> Result<Option<i64>, ApiError> {
    let parsed = match obj.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Some(_) => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| ApiError::UnexpectedShape(format!("node field `{field}` must be numeric")))
}

fn to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// A named shortcut to a well-known node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub key: String,
    /// Distinguishes system shortcuts from user-defined ones.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "name", default)]
    pub node_name: String,
}

impl Target {
    pub fn from_wire(value: &Value) -> Result<Self, ApiError> {
        Target::deserialize(value).map_err(|e| ApiError::UnexpectedShape(format!("target: {e}")))
    }
}

/// Where a new node lands among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    Bottom,
}

impl Position {
    /// Priority zero means "first"; anything else appends.
    pub fn from_priority(priority: i64) -> Self {
        if priority == 0 {
            Position::Top
        } else {
            Position::Bottom
        }
    }
}

/// Request payload for `POST /nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNode {
    pub parent_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub position: Position,
}

/// Partial attribute set for `POST /nodes/<id>`. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_mode: Option<LayoutMode>,
}
