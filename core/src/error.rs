//! Error types for the Workflowy client.
//!
//! # Design
//! Every HTTP status ≥ 400 folds into one `ErrorKind` through
//! `ErrorKind::from_status`, a pure and total mapping, so callers branch on
//! the kind rather than on raw status codes. Failures that never produced a
//! status (network, malformed payloads) report `ErrorKind::Client`.

use std::fmt;

use crate::http::TransportError;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Closed classification of client failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400: the server rejected the payload.
    Validation,
    /// 401 or 403.
    Unauthorized,
    /// 404.
    NotFound,
    /// 429.
    RateLimited,
    /// 500, 502, 503, 504.
    Server,
    /// Any other status, and every failure without a status.
    Client,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::Validation,
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            500 | 502 | 503 | 504 => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation failed",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not found",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Server => "server error",
            ErrorKind::Client => "client error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by `WorkflowyClient` and its resources.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response arrived.
    #[error("network error: {0}")]
    Transport(#[from] TransportError),

    /// A success response whose body is not valid JSON.
    #[error("invalid JSON in response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized.
    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// Valid JSON, but not shaped like the expected payload.
    #[error("unexpected payload: {0}")]
    UnexpectedShape(String),

    /// Node creation succeeded but the response carried no `item_id`.
    #[error("failed to create node, no item_id returned")]
    MissingItemId,

    /// The server answered with a status ≥ 400.
    #[error("{kind} (HTTP {status}): {message}")]
    Status {
        kind: ErrorKind,
        status: u16,
        message: String,
    },
}

impl ApiError {
    /// Build the failure for an error response, classifying its status.
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::Status {
            kind: ErrorKind::from_status(status),
            status,
            message: error_message(status, body),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Status { kind, .. } => *kind,
            _ => ErrorKind::Client,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable description. For status failures this is the message
    /// the server sent, without the kind/status prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Best-effort extraction of a message from an error body: the `error` or
/// `message` field of a JSON object, else the raw body.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    let fallback = || format!("API Error {status}");
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => ["error", "message"]
            .iter()
            .filter_map(|field| json.get(*field))
            .find(|value| !value.is_null())
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(fallback),
        Err(_) if body.is_empty() => fallback(),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_documented_statuses() {
        let cases = [
            (400, ErrorKind::Validation),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Unauthorized),
            (404, ErrorKind::NotFound),
            (429, ErrorKind::RateLimited),
            (500, ErrorKind::Server),
            (502, ErrorKind::Server),
            (503, ErrorKind::Server),
            (504, ErrorKind::Server),
            (418, ErrorKind::Client),
        ];
        for (status, expected) in cases {
            assert_eq!(ErrorKind::from_status(status), expected, "status {status}");
        }
    }

    #[test]
    fn classification_is_total() {
        let documented = [400, 401, 403, 404, 429, 500, 502, 503, 504];
        for status in (400..=u16::MAX).filter(|s| !documented.contains(s)) {
            assert_eq!(ErrorKind::from_status(status), ErrorKind::Client, "status {status}");
        }
    }

    #[test]
    fn message_prefers_error_field() {
        let body = r#"{"error":"Node not found","message":"ignored"}"#;
        assert_eq!(error_message(404, body), "Node not found");
    }

    #[test]
    fn message_falls_back_to_message_field() {
        assert_eq!(error_message(401, r#"{"message":"Bad key"}"#), "Bad key");
        assert_eq!(
            error_message(401, r#"{"error":null,"message":"Bad key"}"#),
            "Bad key"
        );
    }

    #[test]
    fn structured_error_field_is_reencoded() {
        let body = r#"{"error":{"code":"E1"}}"#;
        assert_eq!(error_message(400, body), r#"{"code":"E1"}"#);
    }

    #[test]
    fn non_json_body_is_used_verbatim() {
        assert_eq!(error_message(502, "Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn empty_or_fieldless_body_uses_generic_message() {
        assert_eq!(error_message(500, ""), "API Error 500");
        assert_eq!(error_message(500, r#"{"detail":"x"}"#), "API Error 500");
    }

    #[test]
    fn status_errors_expose_kind_status_and_message() {
        let err = ApiError::from_response(404, r#"{"error":"Node not found"}"#);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "Node not found");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found (HTTP 404): Node not found");
    }

    #[test]
    fn failures_without_status_are_client_errors() {
        let err = ApiError::Transport(TransportError::new("timed out"));
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(err.status(), None);
        assert_eq!(err.message(), "network error: timed out");
        assert_eq!(ApiError::MissingItemId.kind(), ErrorKind::Client);
    }
}
