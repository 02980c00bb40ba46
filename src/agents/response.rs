//! Outbound response map.
//!
//! Every response carries `success` and a non-empty `message`; everything
//! else is per-agent metadata added with [`Response::with`].

use std::fmt::Display;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::llm::LlmUsage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Response(Map<String, Value>);

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(true, message.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(false, message.into())
    }

    fn new(success: bool, message: String) -> Self {
        let message = if message.trim().is_empty() {
            if success { "(empty reply)".to_string() } else { "Request failed".to_string() }
        } else {
            message
        };
        let mut map = Map::new();
        map.insert("success".into(), Value::Bool(success));
        map.insert("message".into(), Value::String(message));
        Self(map)
    }

    /// Set `key`, replacing any previous value.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Attach the underlying error's text as `error`.
    pub fn with_error(self, error: impl Display) -> Self {
        self.with("error", error.to_string())
    }

    /// Attach token usage when the provider reported it.
    pub fn with_usage(self, usage: Option<LlmUsage>) -> Self {
        match usage.and_then(|u| serde_json::to_value(u).ok()) {
            Some(v) => self.with("usage", v),
            None => self,
        }
    }

    pub fn set_if_absent(&mut self, key: &str, value: impl Into<Value>) {
        self.0.entry(key.to_string()).or_insert_with(|| value.into());
    }

    pub fn is_success(&self) -> bool {
        self.0.get("success").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn message(&self) -> &str {
        self.0.get("message").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
