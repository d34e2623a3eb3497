//! The starter node every new project is generated with.

use async_trait::async_trait;
use blok_node::{
  ExecutionContext, HandlerError, Node, NodeOutput, NodeResponse, SchemaError, SchemaPair,
};
use serde_json::{Map, Value, json};

const DEFAULT_MESSAGE: &str = "Hello World from Node!";

/// Answers with the configured `message`, or a greeting when none is set.
///
/// Input: `{ "message"?: string }`. Output: `{ "message": string }`.
pub struct HelloNode {
  schemas: SchemaPair,
}

impl HelloNode {
  pub const NAME: &'static str = "hello";

  pub fn new() -> Result<Self, SchemaError> {
    let schemas = SchemaPair::new(
      json!({
        "type": "object",
        "properties": {
          "message": {"type": "string"}
        }
      }),
      json!({
        "type": "object",
        "properties": {
          "message": {"type": "string"}
        },
        "required": ["message"]
      }),
    )?;
    Ok(Self { schemas })
  }
}

#[async_trait]
impl Node for HelloNode {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn schemas(&self) -> &SchemaPair {
    &self.schemas
  }

  /// Config wins; otherwise a `message` in the merged input is used.
  fn map_config(
    &self,
    mut config: Map<String, Value>,
    _ctx: &ExecutionContext,
    input: &Value,
  ) -> Map<String, Value> {
    if !config.contains_key("message") {
      if let Some(message) = input.get("message") {
        config.insert("message".to_string(), message.clone());
      }
    }
    config
  }

  async fn handle(&self, _ctx: &ExecutionContext, inputs: Value) -> Result<NodeOutput, HandlerError> {
    let message = inputs
      .get("message")
      .and_then(Value::as_str)
      .filter(|m| !m.is_empty())
      .unwrap_or(DEFAULT_MESSAGE);

    Ok(NodeResponse::success(json!({ "message": message })).into())
  }
}
