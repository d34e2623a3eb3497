//! Handler results and the normalized response envelope.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::NodeError;
use crate::node::Node;

/// Default content type of a response.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Response built by a handler.
///
/// Use [`set_success`](Self::set_success) and [`set_error`](Self::set_error)
/// to keep `data` and `error` consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
  pub data: Value,
  pub error: Option<NodeError>,
  pub content_type: String,
}

impl NodeResponse {
  pub fn new() -> Self {
    Self {
      data: Value::Object(Map::new()),
      error: None,
      content_type: DEFAULT_CONTENT_TYPE.to_string(),
    }
  }

  /// A successful response carrying `data`.
  pub fn success(data: Value) -> Self {
    let mut response = Self::new();
    response.set_success(data);
    response
  }

  /// A failed response carrying a business error.
  pub fn failure(error: NodeError) -> Self {
    let mut response = Self::new();
    response.set_error(error);
    response
  }

  /// Set data and clear any error.
  pub fn set_success(&mut self, data: Value) {
    self.data = data;
    self.error = None;
  }

  /// Set a business error and clear data.
  pub fn set_error(&mut self, error: NodeError) {
    self.error = Some(error);
    self.data = Value::Object(Map::new());
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = content_type.into();
    self
  }

  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }
}

impl Default for NodeResponse {
  fn default() -> Self {
    Self::new()
  }
}

/// What a handler hands back to the runner.
pub enum NodeOutput {
  /// A finished response.
  Response(NodeResponse),
  /// Further nodes to run. The runner records them in the envelope but does
  /// not schedule them.
  Steps(Vec<Arc<dyn Node>>),
}

impl From<NodeResponse> for NodeOutput {
  fn from(response: NodeResponse) -> Self {
    Self::Response(response)
  }
}

impl std::fmt::Debug for NodeOutput {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Response(response) => f.debug_tuple("Response").field(response).finish(),
      Self::Steps(steps) => f.debug_tuple("Steps").field(&step_names(steps)).finish(),
    }
  }
}

/// Normalized result of a node run.
///
/// `success` is true exactly when `error` is `None`; when an error is set,
/// `data` is an empty object. `steps` is never serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
  pub success: bool,
  pub data: Value,
  pub error: Option<NodeError>,
  pub content_type: String,
  #[serde(skip)]
  pub steps: Vec<Arc<dyn Node>>,
}

impl ResponseEnvelope {
  /// The initial state of every run: successful and empty.
  pub fn new() -> Self {
    Self {
      success: true,
      data: Value::Object(Map::new()),
      error: None,
      content_type: DEFAULT_CONTENT_TYPE.to_string(),
      steps: Vec::new(),
    }
  }

  /// Names of the fan-out steps, in order.
  pub fn step_names(&self) -> Vec<String> {
    step_names(&self.steps)
  }
}

impl Default for ResponseEnvelope {
  fn default() -> Self {
    Self::new()
  }
}

impl From<NodeResponse> for ResponseEnvelope {
  fn from(response: NodeResponse) -> Self {
    let mut envelope = Self::new();
    envelope.content_type = response.content_type;
    match response.error {
      Some(error) => {
        envelope.success = false;
        envelope.error = Some(error);
      }
      None => envelope.data = response.data,
    }
    envelope
  }
}

impl std::fmt::Debug for ResponseEnvelope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResponseEnvelope")
      .field("success", &self.success)
      .field("data", &self.data)
      .field("error", &self.error)
      .field("content_type", &self.content_type)
      .field("steps", &self.step_names())
      .finish()
  }
}

fn step_names(steps: &[Arc<dyn Node>]) -> Vec<String> {
  steps.iter().map(|s| s.name().to_string()).collect()
}
