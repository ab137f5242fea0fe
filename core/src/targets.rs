//! Target operations: list the shortcuts the account exposes.

use serde_json::Value;

use crate::client::WorkflowyClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpTransport};
use crate::types::Target;

/// Target-oriented API, borrowed from a `WorkflowyClient`.
pub struct Targets<'a, T> {
    client: &'a WorkflowyClient<T>,
}

impl<'a, T: HttpTransport> Targets<'a, T> {
    pub(crate) fn new(client: &'a WorkflowyClient<T>) -> Self {
        Self { client }
    }

    /// All targets, in server order. Empty when the server reports none.
    pub fn list(&self) -> Result<Vec<Target>> {
        let response = self.client.request(HttpMethod::Get, "targets", None)?;
        match response.get("targets") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(Target::from_wire).collect(),
            Some(other) => Err(ApiError::UnexpectedShape(format!(
                "`targets` must be an array, got {other}"
            ))),
        }
    }
}
