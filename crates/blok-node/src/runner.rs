//! Node runner.
//!
//! [`NodeRunner`] drives a single node invocation:
//!
//! 1. clone the context config and compute the merged input
//! 2. apply the node's config mapping
//! 3. validate the mapped config against the input schema
//! 4. await `handle` (the only suspension point)
//! 5. validate successful output data against the output schema
//! 6. normalize the result into a [`ResponseEnvelope`] and log the timing
//!
//! Schema violations and unexpected handler failures are returned as
//! [`RunError`]; business errors come back as an envelope with
//! `success == false`.

use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::context::ExecutionContext;
use crate::error::RunError;
use crate::events::{NoopNotifier, RunEvent, RunNotifier};
use crate::node::Node;
use crate::response::{NodeOutput, ResponseEnvelope};

/// Runs nodes and reports run events to a notifier.
///
/// Holds no per-run state, so one runner can drive any number of concurrent
/// runs.
pub struct NodeRunner<E: RunNotifier = NoopNotifier> {
  notifier: E,
}

impl NodeRunner<NoopNotifier> {
  /// Create a runner that discards run events.
  pub fn new() -> Self {
    Self::with_notifier(NoopNotifier)
  }
}

impl Default for NodeRunner<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E: RunNotifier> NodeRunner<E> {
  /// Create a runner with a custom notifier.
  pub fn with_notifier(notifier: E) -> Self {
    Self { notifier }
  }

  /// Run `node` against `ctx`.
  pub async fn run<N: Node + ?Sized>(
    &self,
    node: &N,
    ctx: &ExecutionContext,
  ) -> Result<ResponseEnvelope, RunError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    self.execute(node, ctx, &run_id, None).await
  }

  /// Run `node` against `ctx`, aborting with [`RunError::Cancelled`] if
  /// `cancel` fires before the handler completes.
  pub async fn run_with_cancel<N: Node + ?Sized>(
    &self,
    node: &N,
    ctx: &ExecutionContext,
    cancel: CancellationToken,
  ) -> Result<ResponseEnvelope, RunError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    self.execute(node, ctx, &run_id, Some(&cancel)).await
  }

  #[instrument(
    name = "node_run",
    skip(self, node, ctx, run_id, cancel),
    fields(node = %node.name(), run_id = %run_id)
  )]
  async fn execute<N: Node + ?Sized>(
    &self,
    node: &N,
    ctx: &ExecutionContext,
    run_id: &str,
    cancel: Option<&CancellationToken>,
  ) -> Result<ResponseEnvelope, RunError> {
    let start = Instant::now();
    info!(config = ?ctx.config, "node started");
    self.notifier.notify(RunEvent::NodeStarted {
      run_id: run_id.to_string(),
      node: node.name().to_string(),
    });

    let result = self.execute_inner(node, ctx, cancel).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    match result {
      Ok(output) => {
        let envelope = into_envelope(output);
        info!(elapsed_ms, success = envelope.success, "node executed");
        self.notifier.notify(RunEvent::NodeCompleted {
          run_id: run_id.to_string(),
          node: node.name().to_string(),
          success: envelope.success,
          elapsed_ms,
        });
        Ok(envelope)
      }
      Err(e) => {
        error!(error = %e, elapsed_ms, "node failed");
        self.notifier.notify(RunEvent::NodeFailed {
          run_id: run_id.to_string(),
          node: node.name().to_string(),
          error: e.to_string(),
        });
        Err(e)
      }
    }
  }

  async fn execute_inner<N: Node + ?Sized>(
    &self,
    node: &N,
    ctx: &ExecutionContext,
    cancel: Option<&CancellationToken>,
  ) -> Result<NodeOutput, RunError> {
    // Map config from a private copy
    let input = ctx.merged_input();
    let config = node.map_config(ctx.config.clone(), ctx, &input);
    let config = Value::Object(config);

    // Validate input
    node
      .schemas()
      .validate_input(&config)
      .map_err(|source| RunError::InputValidation {
        node: node.name().to_string(),
        source,
      })?;

    // Execute handler
    let handled = match cancel {
      Some(cancel) => {
        if cancel.is_cancelled() {
          return Err(RunError::Cancelled);
        }
        tokio::select! {
          biased;
          _ = cancel.cancelled() => return Err(RunError::Cancelled),
          handled = node.handle(ctx, config) => handled,
        }
      }
      None => node.handle(ctx, config).await,
    };

    let output = handled.map_err(|source| RunError::Handler {
      node: node.name().to_string(),
      source,
    })?;

    // Validate output; business errors and fan-out results are not checked
    if let NodeOutput::Response(response) = &output {
      if response.is_success() {
        node
          .schemas()
          .validate_output(&response.data)
          .map_err(|source| RunError::OutputValidation {
            node: node.name().to_string(),
            source,
          })?;
      }
    }

    Ok(output)
  }
}

fn into_envelope(output: NodeOutput) -> ResponseEnvelope {
  match output {
    NodeOutput::Response(response) => ResponseEnvelope::from(response),
    NodeOutput::Steps(steps) => ResponseEnvelope {
      steps,
      ..ResponseEnvelope::new()
    },
  }
}
