//! Error types for node execution.
//!
//! Two families live here. [`SchemaError`] and [`RunError`] are Rust errors
//! that abort a run. [`NodeError`] is not a Rust error at all from the
//! runner's point of view: it is the structured business failure a handler
//! attaches to its response, and it travels back to the caller inside the
//! envelope.

use serde::{Deserialize, Serialize};

/// Boxed error returned by handlers for failures they did not anticipate.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while compiling or applying a JSON Schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
  /// The schema document itself is not a valid draft-07 schema.
  #[error("invalid json schema: {message}")]
  InvalidSchema { message: String },

  /// The instance violates the schema.
  ///
  /// `message` is the sorted, `", "`-joined rendering of `violations`.
  #[error("{message}")]
  Violations {
    message: String,
    violations: Vec<String>,
  },
}

impl SchemaError {
  /// Create an invalid schema error.
  pub fn invalid_schema(message: impl Into<String>) -> Self {
    Self::InvalidSchema {
      message: message.into(),
    }
  }

  /// Build an aggregated violation error.
  ///
  /// Violations are sorted so the message does not depend on the order the
  /// validator reported them in.
  pub fn violations(mut violations: Vec<String>) -> Self {
    violations.sort();
    Self::Violations {
      message: violations.join(", "),
      violations,
    }
  }
}

/// Errors that abort a node run. No envelope is produced when one of these
/// is returned.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  /// The mapped configuration did not satisfy the node's input schema.
  /// The handler was not invoked.
  #[error("input validation failed for node '{node}': {source}")]
  InputValidation {
    node: String,
    #[source]
    source: SchemaError,
  },

  /// The handler's data did not satisfy the node's output schema.
  /// The handler has already run.
  #[error("output validation failed for node '{node}': {source}")]
  OutputValidation {
    node: String,
    #[source]
    source: SchemaError,
  },

  /// The handler failed in a way it did not convert into a business error.
  #[error("node '{node}' failed: {source}")]
  Handler {
    node: String,
    #[source]
    source: HandlerError,
  },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}

impl RunError {
  /// The violated schema error, if this run failed validation.
  pub fn schema_error(&self) -> Option<&SchemaError> {
    match self {
      Self::InputValidation { source, .. } | Self::OutputValidation { source, .. } => Some(source),
      _ => None,
    }
  }
}

/// Structured business error set by a handler.
///
/// Serializes to a plain mapping with at least `message`; unset optional
/// fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeError {
  /// Human-readable description.
  pub message: String,
  /// Status-like code (e.g. 429, 500).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<u16>,
  /// Name of the node that produced the error.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Diagnostic trace text.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stack: Option<String>,
  /// Arbitrary structured detail.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub json: Option<serde_json::Value>,
}

impl NodeError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      code: None,
      name: None,
      stack: None,
      json: None,
    }
  }

  pub fn with_code(mut self, code: u16) -> Self {
    self.code = Some(code);
    self
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
    self.stack = Some(stack.into());
    self
  }

  pub fn with_json(mut self, json: serde_json::Value) -> Self {
    self.json = Some(json);
    self
  }
}

impl std::fmt::Display for NodeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.code {
      Some(code) => write!(f, "{} ({})", self.message, code),
      None => f.write_str(&self.message),
    }
  }
}
