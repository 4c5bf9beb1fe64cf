//! Transport-agnostic command descriptor.
//!
//! One immutable value describing one action to send: a name, a parameter
//! map, a request id unique within the process session and an optional
//! override of the relay API path. No validation of parameter shapes happens
//! here; the builders in [`crate::builders`] are responsible for
//! vendor-specific shapes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One action to send to the device through the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    name: String,
    params: Map<String, Value>,
    request_id: String,
    api: Option<String>,
}

impl Command {
    /// Build a command. A request id is generated unless the caller already
    /// put an `id` key into the parameter map.
    pub fn new(name: impl Into<String>, params: Map<String, Value>) -> Self {
        let request_id = params
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(next_request_id);
        Self {
            name: name.into(),
            params,
            request_id,
            api: None,
        }
    }

    /// Build a command with no parameters.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }

    /// Override the relay API path for this command.
    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn api(&self) -> Option<&str> {
        self.api.as_deref()
    }

    /// Parameter map with the request id merged in, as sent on the wire.
    pub fn params_with_id(&self) -> Map<String, Value> {
        let mut params = self.params.clone();
        params.insert("id".to_string(), Value::String(self.request_id.clone()));
        params
    }
}

/// Generate a request id unique within the process session.
///
/// The vendor protocol expects a short numeric string.
pub fn next_request_id() -> String {
    rand::thread_rng().gen_range(10_000_000u64..100_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_request_ids_are_numeric_and_distinct() {
        let a = Command::bare("getBattery");
        let b = Command::bare("getBattery");
        assert!(a.request_id().chars().all(|c| c.is_ascii_digit()));
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn caller_supplied_id_wins() {
        let mut params = Map::new();
        params.insert("id".to_string(), json!("42"));
        let cmd = Command::new("clean", params);
        assert_eq!(cmd.request_id(), "42");
        assert_eq!(cmd.params_with_id()["id"], json!("42"));
    }

    #[test]
    fn params_with_id_merges_without_mutating() {
        let mut params = Map::new();
        params.insert("act".to_string(), json!("start"));
        let cmd = Command::new("clean", params);
        let wire = cmd.params_with_id();
        assert_eq!(wire["act"], json!("start"));
        assert_eq!(wire["id"], json!(cmd.request_id()));
        // The descriptor itself stays id-free.
        assert!(cmd.params().get("id").is_none());
    }
}
