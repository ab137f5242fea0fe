//! Synchronous client for the Workflowy REST API.
//!
//! # Overview
//! Maps outline nodes and named targets to typed values and exposes CRUD
//! operations over an injected HTTP transport.
//!
//! # Design
//! - `WorkflowyClient::request` is the only place requests are built and
//!   responses interpreted; `Nodes` and `Targets` are thin resource handles
//!   on top of it.
//! - The transport is a trait (`HttpTransport`) so hosts choose the HTTP
//!   stack. `UreqTransport` is provided behind the default `ureq` feature.
//! - Every HTTP status ≥ 400 folds into one `ErrorKind`.
//! - Node values are snapshots rebuilt from each response; nothing is cached.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod nodes;
pub mod targets;
pub mod types;
#[cfg(feature = "ureq")]
mod ureq_transport;

#[cfg(test)]
mod testing;

pub use client::WorkflowyClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ErrorKind, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use nodes::Nodes;
pub use targets::Targets;
pub use types::{CreateNode, LayoutMode, Node, Position, Target, UpdateNode, ROOT_NODE_ID};
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;
