//! Authenticated request construction and response interpretation.
//!
//! # Design
//! `WorkflowyClient` owns an immutable `ClientConfig` and the injected
//! transport. `request` is the single choke point: it builds one
//! `HttpRequest`, performs exactly one `send`, and either decodes the body
//! into a JSON object or classifies the failure. No retries, backoff or
//! pooling happen here.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::nodes::Nodes;
use crate::targets::Targets;

/// Synchronous client for the Workflowy REST API.
#[derive(Debug, Clone)]
pub struct WorkflowyClient<T> {
    config: ClientConfig,
    transport: T,
}

impl<T: HttpTransport> WorkflowyClient<T> {
    pub fn new(api_key: impl Into<String>, transport: T) -> Self {
        Self::with_config(ClientConfig::new(api_key), transport)
    }

    pub fn with_config(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn nodes(&self) -> Nodes<'_, T> {
        Nodes::new(self)
    }

    pub fn targets(&self) -> Targets<'_, T> {
        Targets::new(self)
    }

    /// Perform one API call and return the decoded JSON object.
    ///
    /// For GET the payload becomes the query string; for every other method
    /// it becomes the JSON body. An empty success body yields an empty map.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<Map<String, Value>> {
        let request = self.build_request(method, path, data)?;
        debug!(method = %request.method, uri = %request.uri, "sending request");

        let response = self.transport.send(request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        parse_response(response)
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<HttpRequest> {
        let mut uri = format!(
            "{}/{}",
            self.config.base_url(),
            path.trim_start_matches('/')
        );
        let data = data.filter(|d| !d.is_empty());

        let mut body = None;
        if let Some(data) = data {
            if method.is_read() {
                let query = query_string(data);
                if !query.is_empty() {
                    uri.push(if uri.contains('?') { '&' } else { '?' });
                    uri.push_str(&query);
                }
            } else {
                body = Some(serde_json::to_string(data).map_err(ApiError::Encode)?);
            }
        }

        Ok(HttpRequest {
            method,
            uri,
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key()),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body,
        })
    }
}

/// URL-encode a payload. Nulls are skipped; strings go in raw; everything
/// else uses its JSON text.
fn query_string(data: &Map<String, Value>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in data {
        match value {
            Value::Null => {}
            Value::String(s) => {
                query.append_pair(key, s);
            }
            other => {
                query.append_pair(key, &other.to_string());
            }
        }
    }
    query.finish()
}

fn parse_response(response: HttpResponse) -> Result<Map<String, Value>> {
    if response.status >= 400 {
        let err = ApiError::from_response(response.status, &response.body);
        debug!(status = response.status, kind = %err.kind(), "request failed");
        return Err(err);
    }
    if response.body.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&response.body).map_err(ApiError::Decode)? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::UnexpectedShape(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
