//! Integration tests for NodeRunner.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blok_node::{
  ChannelNotifier, ExecutionContext, HandlerError, Node, NodeError, NodeOutput, NodeResponse,
  NodeRunner, RunError, RunEvent, SchemaError, SchemaPair,
};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

enum Behavior {
  /// Return the inputs as data.
  Echo,
  /// Return fixed data.
  Fixed(Value),
  /// Return a business error.
  BusinessError(NodeError),
  /// Fail with an unexpected error.
  Fail(&'static str),
  /// Fan out into further nodes.
  FanOut,
  /// Sleep, then echo.
  Sleep(u64),
}

struct SpyNode {
  name: String,
  schemas: SchemaPair,
  behavior: Behavior,
  calls: AtomicUsize,
}

impl SpyNode {
  fn new(behavior: Behavior) -> Self {
    Self::with_schemas(SchemaPair::default(), behavior)
  }

  fn with_schemas(schemas: SchemaPair, behavior: Behavior) -> Self {
    Self {
      name: "spy".to_string(),
      schemas,
      behavior,
      calls: AtomicUsize::new(0),
    }
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Node for SpyNode {
  fn name(&self) -> &str {
    &self.name
  }

  fn schemas(&self) -> &SchemaPair {
    &self.schemas
  }

  async fn handle(&self, _ctx: &ExecutionContext, inputs: Value) -> Result<NodeOutput, HandlerError> {
    self.calls.fetch_add(1, Ordering::SeqCst);

    match &self.behavior {
      Behavior::Echo => Ok(NodeResponse::success(inputs).into()),
      Behavior::Fixed(data) => Ok(NodeResponse::success(data.clone()).into()),
      Behavior::BusinessError(error) => Ok(NodeResponse::failure(error.clone()).into()),
      Behavior::Fail(message) => Err((*message).into()),
      Behavior::FanOut => Ok(NodeOutput::Steps(vec![
        Arc::new(SpyNode::new(Behavior::Echo)) as Arc<dyn Node>,
        Arc::new(SpyNode::new(Behavior::Echo)) as Arc<dyn Node>,
      ])),
      Behavior::Sleep(ms) => {
        tokio::time::sleep(Duration::from_millis(*ms)).await;
        Ok(NodeResponse::success(inputs).into())
      }
    }
  }
}

/// Node whose config mapping copies the merged input into the config and
/// mutates it.
struct MappingNode {
  schemas: SchemaPair,
  seen_input: Mutex<Option<Value>>,
}

#[async_trait]
impl Node for MappingNode {
  fn name(&self) -> &str {
    "mapping"
  }

  fn schemas(&self) -> &SchemaPair {
    &self.schemas
  }

  fn map_config(
    &self,
    mut config: Map<String, Value>,
    _ctx: &ExecutionContext,
    input: &Value,
  ) -> Map<String, Value> {
    *self.seen_input.lock().unwrap() = Some(input.clone());
    config.insert("input".to_string(), input.clone());
    config.insert("source".to_string(), json!("mapped"));
    config
  }

  async fn handle(&self, _ctx: &ExecutionContext, inputs: Value) -> Result<NodeOutput, HandlerError> {
    Ok(NodeResponse::success(inputs).into())
  }
}

fn config(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected object, got {}", other),
  }
}

fn name_schema() -> Value {
  json!({
    "type": "object",
    "properties": {"name": {"type": "string"}},
    "required": ["name"]
  })
}

fn result_schema() -> Value {
  json!({
    "type": "object",
    "properties": {"result": {"type": "string"}},
    "required": ["result"]
  })
}

#[tokio::test]
async fn test_run_returns_success_envelope() {
  let node = SpyNode::new(Behavior::Echo);
  let ctx = ExecutionContext::new().with_config(config(json!({"message": "hi"})));

  let envelope = node.run(&ctx).await.expect("run should succeed");

  assert!(envelope.success);
  assert!(envelope.error.is_none());
  assert_eq!(envelope.data, json!({"message": "hi"}));
  assert_eq!(envelope.content_type, "application/json");
  assert_eq!(node.calls(), 1);
}

#[tokio::test]
async fn test_input_violation_raises_before_handler() {
  let schemas = SchemaPair::new(name_schema(), json!({})).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::Echo);
  let ctx = ExecutionContext::new().with_config(config(json!({"name": 123})));

  let err = node.run(&ctx).await.unwrap_err();

  assert!(matches!(err, RunError::InputValidation { .. }), "got {:?}", err);
  assert_eq!(node.calls(), 0);
  match err.schema_error() {
    Some(SchemaError::Violations { message, .. }) => {
      assert!(message.starts_with("/name "), "unexpected message: {}", message);
    }
    other => panic!("expected violations, got {:?}", other),
  }
}

#[tokio::test]
async fn test_missing_required_input_raises() {
  let schemas = SchemaPair::new(name_schema(), json!({})).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::Echo);

  let err = node.run(&ExecutionContext::new()).await.unwrap_err();

  assert!(matches!(err, RunError::InputValidation { .. }));
  assert_eq!(node.calls(), 0);
}

#[tokio::test]
async fn test_output_violation_raises_after_handler() {
  let schemas = SchemaPair::new(json!({}), result_schema()).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::Fixed(json!({})));

  let err = node.run(&ExecutionContext::new()).await.unwrap_err();

  assert!(matches!(err, RunError::OutputValidation { .. }), "got {:?}", err);
  assert_eq!(node.calls(), 1);
}

#[tokio::test]
async fn test_valid_output_passes() {
  let schemas = SchemaPair::new(json!({}), result_schema()).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::Fixed(json!({"result": "ok"})));

  let envelope = node.run(&ExecutionContext::new()).await.unwrap();

  assert!(envelope.success);
  assert_eq!(envelope.data, json!({"result": "ok"}));
}

#[tokio::test]
async fn test_business_error_is_returned_in_envelope() {
  // The output schema would reject `{}`; business errors are not output-validated.
  let schemas = SchemaPair::new(json!({}), result_schema()).unwrap();
  let node = SpyNode::with_schemas(
    schemas,
    Behavior::BusinessError(NodeError::new("rate limited").with_code(429)),
  );

  let envelope = node.run(&ExecutionContext::new()).await.unwrap();

  assert!(!envelope.success);
  assert_eq!(envelope.data, json!({}));
  let error = envelope.error.clone().expect("error should be set");
  assert_eq!(error.message, "rate limited");
  assert_eq!(
    serde_json::to_value(&envelope).unwrap(),
    json!({
      "success": false,
      "data": {},
      "error": {"message": "rate limited", "code": 429},
      "contentType": "application/json"
    })
  );
}

#[tokio::test]
async fn test_unexpected_handler_failure_propagates() {
  let node = SpyNode::new(Behavior::Fail("connection reset"));

  let err = node.run(&ExecutionContext::new()).await.unwrap_err();

  match err {
    RunError::Handler { node, source } => {
      assert_eq!(node, "spy");
      assert_eq!(source.to_string(), "connection reset");
    }
    other => panic!("expected handler error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_mapper_sees_response_data_over_body() {
  let node = MappingNode {
    schemas: SchemaPair::default(),
    seen_input: Mutex::new(None),
  };
  let ctx = ExecutionContext::new()
    .with_body(json!({"y": 2}))
    .with_response_data(json!({"x": 1}));

  let envelope = node.run(&ctx).await.unwrap();

  assert_eq!(*node.seen_input.lock().unwrap(), Some(json!({"x": 1})));
  assert_eq!(envelope.data["input"], json!({"x": 1}));
}

#[tokio::test]
async fn test_mapper_mutation_does_not_leak_into_context() {
  let node = MappingNode {
    schemas: SchemaPair::default(),
    seen_input: Mutex::new(None),
  };
  let ctx = ExecutionContext::new()
    .with_config(config(json!({"request_id": "req_12345"})))
    .with_body(json!({"user_id": "user_789"}));
  let before = ctx.clone();

  let envelope = node.run(&ctx).await.unwrap();

  assert_eq!(envelope.data["source"], "mapped");
  assert_eq!(envelope.data["request_id"], "req_12345");
  assert_eq!(ctx, before);
  assert!(!ctx.config.contains_key("source"));
}

#[tokio::test]
async fn test_mapped_config_is_what_gets_validated() {
  let schemas = SchemaPair::new(
    json!({"type": "object", "required": ["source"]}),
    json!({}),
  )
  .unwrap();
  let node = MappingNode {
    schemas,
    seen_input: Mutex::new(None),
  };

  let envelope = node.run(&ExecutionContext::new()).await.unwrap();

  assert!(envelope.success);
}

#[tokio::test]
async fn test_fan_out_steps_are_carried_not_run() {
  let node = SpyNode::new(Behavior::FanOut);

  let envelope = node.run(&ExecutionContext::new()).await.unwrap();

  assert!(envelope.success);
  assert_eq!(envelope.data, json!({}));
  assert_eq!(envelope.step_names(), vec!["spy", "spy"]);
  assert!(serde_json::to_value(&envelope).unwrap().get("steps").is_none());
}

#[tokio::test]
async fn test_fan_out_skips_output_validation() {
  let schemas = SchemaPair::new(json!({}), result_schema()).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::FanOut);

  let envelope = node.run(&ExecutionContext::new()).await.unwrap();

  assert!(envelope.success);
  assert_eq!(envelope.data, json!({}));
  assert_eq!(envelope.step_names().len(), 2);
}

#[tokio::test]
async fn test_invalid_output_schema_surfaces_at_output_validation() {
  let schemas = SchemaPair::new(json!({}), json!({"type": 12})).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::Fixed(json!({"result": "ok"})));

  let err = node.run(&ExecutionContext::new()).await.unwrap_err();

  assert!(
    matches!(
      err,
      RunError::OutputValidation {
        source: SchemaError::InvalidSchema { .. },
        ..
      }
    ),
    "got {:?}",
    err
  );
  assert_eq!(node.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
  let node = Arc::new(SpyNode::new(Behavior::Sleep(20)));

  let ctx_a = ExecutionContext::new().with_config(config(json!({"value": 1})));
  let ctx_b = ExecutionContext::new().with_config(config(json!({"value": 2})));

  let a = {
    let node = node.clone();
    tokio::spawn(async move { node.run(&ctx_a).await })
  };
  let b = {
    let node = node.clone();
    tokio::spawn(async move { node.run(&ctx_b).await })
  };

  let a = a.await.unwrap().unwrap();
  let b = b.await.unwrap().unwrap();

  assert_eq!(a.data, json!({"value": 1}));
  assert_eq!(b.data, json!({"value": 2}));
  assert_eq!(node.calls(), 2);
}

#[tokio::test]
async fn test_runner_emits_events() {
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  let runner = NodeRunner::with_notifier(ChannelNotifier::new(tx));
  let node = SpyNode::new(Behavior::Echo);

  runner.run(&node, &ExecutionContext::new()).await.unwrap();

  let started = rx.recv().await.unwrap();
  let completed = rx.recv().await.unwrap();

  let run_id = match started {
    RunEvent::NodeStarted { run_id, node } => {
      assert_eq!(node, "spy");
      run_id
    }
    other => panic!("expected NodeStarted, got {:?}", other),
  };
  match completed {
    RunEvent::NodeCompleted {
      run_id: completed_id,
      success,
      elapsed_ms,
      ..
    } => {
      assert_eq!(completed_id, run_id);
      assert!(success);
      assert!(elapsed_ms >= 0.0);
    }
    other => panic!("expected NodeCompleted, got {:?}", other),
  }
}

#[tokio::test]
async fn test_runner_emits_failure_event() {
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  let runner = NodeRunner::with_notifier(ChannelNotifier::new(tx));
  let schemas = SchemaPair::new(name_schema(), json!({})).unwrap();
  let node = SpyNode::with_schemas(schemas, Behavior::Echo);

  assert!(runner.run(&node, &ExecutionContext::new()).await.is_err());

  assert!(matches!(rx.recv().await, Some(RunEvent::NodeStarted { .. })));
  assert!(matches!(rx.recv().await, Some(RunEvent::NodeFailed { .. })));
}

#[tokio::test]
async fn test_run_with_cancel_aborts_handler() {
  let runner = NodeRunner::new();
  let node = SpyNode::new(Behavior::Sleep(5_000));
  let cancel = CancellationToken::new();

  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let err = runner
    .run_with_cancel(&node, &ExecutionContext::new(), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, RunError::Cancelled));
}

#[tokio::test]
async fn test_run_with_cancelled_token_skips_handler() {
  let runner = NodeRunner::new();
  let node = SpyNode::new(Behavior::Echo);
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = runner
    .run_with_cancel(&node, &ExecutionContext::new(), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, RunError::Cancelled));
  assert_eq!(node.calls(), 0);
}

#[tokio::test]
async fn test_set_schemas_applies_to_subsequent_runs() {
  let mut node = SpyNode::new(Behavior::Echo);
  let ctx = ExecutionContext::new().with_config(config(json!({"name": 1})));

  assert!(node.run(&ctx).await.is_ok());

  node.schemas.set_schemas(name_schema(), json!({})).unwrap();

  assert!(node.run(&ctx).await.is_err());
}
