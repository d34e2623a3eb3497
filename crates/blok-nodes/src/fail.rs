//! A node that always reports a business error.

use async_trait::async_trait;
use blok_node::{
  ExecutionContext, HandlerError, Node, NodeError, NodeOutput, NodeResponse, SchemaError,
  SchemaPair,
};
use serde_json::{Value, json};
use tracing::debug;

/// Returns the configured error through the envelope instead of failing
/// the run.
///
/// Input: `{ "message": string, "code"?: integer, "detail"?: any }`.
pub struct FailNode {
  schemas: SchemaPair,
}

impl FailNode {
  pub const NAME: &'static str = "fail";

  pub fn new() -> Result<Self, SchemaError> {
    let schemas = SchemaPair::new(
      json!({
        "type": "object",
        "properties": {
          "message": {"type": "string", "minLength": 1},
          "code": {"type": "integer", "minimum": 100, "maximum": 599}
        },
        "required": ["message"]
      }),
      json!({}),
    )?;
    Ok(Self { schemas })
  }
}

#[async_trait]
impl Node for FailNode {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn schemas(&self) -> &SchemaPair {
    &self.schemas
  }

  async fn handle(&self, _ctx: &ExecutionContext, inputs: Value) -> Result<NodeOutput, HandlerError> {
    let message = inputs
      .get("message")
      .and_then(Value::as_str)
      .unwrap_or_default();

    let mut error = NodeError::new(message).with_name(Self::NAME);
    if let Some(code) = inputs
      .get("code")
      .and_then(Value::as_u64)
      .and_then(|c| u16::try_from(c).ok())
    {
      error = error.with_code(code);
    }
    if let Some(detail) = inputs.get("detail") {
      error = error.with_json(detail.clone());
    }

    debug!(error = %error, "reporting configured error");
    Ok(NodeResponse::failure(error).into())
  }
}
