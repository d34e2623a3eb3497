//! Run events and notifiers.
//!
//! The runner emits an event when a node starts and when it finishes, so
//! callers can persist timings or stream progress without the core knowing
//! about any particular sink.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a node run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
  /// The node run has started.
  NodeStarted { run_id: String, node: String },

  /// The node returned an envelope. `success` is false for business errors.
  NodeCompleted {
    run_id: String,
    node: String,
    success: bool,
    elapsed_ms: f64,
  },

  /// The run was aborted (schema violation, handler failure, cancellation).
  NodeFailed {
    run_id: String,
    node: String,
    error: String,
  },
}

/// Receives run events.
pub trait RunNotifier: Send + Sync {
  fn notify(&self, event: RunEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
