use blok_node::SchemaError;
use thiserror::Error;

/// Errors that can occur when looking up or registering nodes.
#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("node not found: {0}")]
  NotFound(String),

  #[error("node already registered: {0}")]
  Duplicate(String),

  #[error("failed to build node schemas: {0}")]
  Schema(#[from] SchemaError),
}
