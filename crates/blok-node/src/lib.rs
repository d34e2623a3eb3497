//! Blok Node
//!
//! This crate provides the execution envelope for a single blok node. Given
//! an [`ExecutionContext`] it validates the node's input against its JSON
//! Schema, invokes the node's business logic, validates the result, and
//! returns a normalized [`ResponseEnvelope`] with timing instrumentation.
//!
//! Concrete nodes implement the [`Node`] trait. Scheduling of further nodes,
//! retries and persistence are left to the surrounding workflow runtime.

mod context;
mod error;
mod events;
mod node;
mod response;
mod runner;
mod schema;

pub use context::{ExecutionContext, RequestContext, ResponseData};
pub use error::{HandlerError, NodeError, RunError, SchemaError};
pub use events::{ChannelNotifier, NoopNotifier, RunEvent, RunNotifier};
pub use node::Node;
pub use response::{DEFAULT_CONTENT_TYPE, NodeOutput, NodeResponse, ResponseEnvelope};
pub use runner::NodeRunner;
pub use schema::{SchemaPair, Schemas, validate};
