//! Invocation context handed to a node.
//!
//! The trigger layer builds one [`ExecutionContext`] per invocation. The
//! runner only borrows it; anything it needs to modify (the node config) is
//! cloned first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything a node can see about the invocation it is part of.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
  /// Invocation identifier assigned by the caller, if any.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub id: String,
  /// Node-specific parameters.
  #[serde(default)]
  pub config: Map<String, Value>,
  /// Inbound request that started the workflow.
  #[serde(default)]
  pub request: RequestContext,
  /// Output of the upstream node in the same workflow.
  #[serde(default)]
  pub response: ResponseData,
}

/// Inbound request data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
  #[serde(default)]
  pub body: Value,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub headers: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub query: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub params: Map<String, Value>,
}

/// Upstream node output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

impl ExecutionContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = id.into();
    self
  }

  pub fn with_config(mut self, config: Map<String, Value>) -> Self {
    self.config = config;
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.request.body = body;
    self
  }

  pub fn with_response_data(mut self, data: Value) -> Self {
    self.response.data = Some(data);
    self
  }

  /// The effective input of the node.
  ///
  /// Upstream `response.data` wins whenever it is present and non-empty;
  /// otherwise the request body is used. This is a whole-object fallback,
  /// the two sources are never merged field by field.
  pub fn merged_input(&self) -> Value {
    match &self.response.data {
      Some(data) if !is_empty(data) => data.clone(),
      _ if self.request.body.is_null() => Value::Object(Map::new()),
      _ => self.request.body.clone(),
    }
  }
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Object(map) => map.is_empty(),
    Value::Array(items) => items.is_empty(),
    Value::String(s) => s.is_empty(),
    Value::Bool(_) | Value::Number(_) => false,
  }
}
