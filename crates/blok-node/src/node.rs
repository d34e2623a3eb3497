//! The capability every node implements.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::error::{HandlerError, RunError};
use crate::response::{NodeOutput, ResponseEnvelope};
use crate::runner::NodeRunner;
use crate::schema::SchemaPair;

/// A single unit of workflow logic.
///
/// Implementors supply a name, their schema pair, and [`handle`](Node::handle).
/// Validation, timing and envelope normalization are done by [`NodeRunner`];
/// [`run`](Node::run) is a shortcut for running through a default runner.
///
/// # Errors
///
/// Expected domain failures belong in the returned
/// [`NodeResponse`](crate::NodeResponse) via `set_error`. An `Err` from
/// `handle` is treated as an unexpected failure and aborts the run.
#[async_trait]
pub trait Node: Send + Sync {
  /// Stable node name, used in logs and errors.
  fn name(&self) -> &str;

  /// Input and output schemas of this node.
  fn schemas(&self) -> &SchemaPair;

  /// Transform the node config before validation.
  ///
  /// Receives a private copy of the context config and the merged input
  /// (see [`ExecutionContext::merged_input`]). The default returns `config`
  /// unchanged.
  fn map_config(
    &self,
    config: Map<String, Value>,
    _ctx: &ExecutionContext,
    _input: &Value,
  ) -> Map<String, Value> {
    config
  }

  /// Business logic over the mapped, validated config.
  async fn handle(&self, ctx: &ExecutionContext, inputs: Value) -> Result<NodeOutput, HandlerError>;

  /// Run this node with a default [`NodeRunner`].
  async fn run(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RunError> {
    NodeRunner::new().run(self, ctx).await
  }
}
