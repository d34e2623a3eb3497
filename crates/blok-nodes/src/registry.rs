use std::collections::BTreeMap;
use std::sync::Arc;

use blok_node::Node;

use crate::error::RegistryError;
use crate::fail::FailNode;
use crate::hello::HelloNode;

/// Name-indexed collection of runnable nodes.
#[derive(Clone, Default)]
pub struct NodeRegistry {
  nodes: BTreeMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a registry holding the built-in nodes.
  pub fn builtin() -> Result<Self, RegistryError> {
    let mut registry = Self::new();
    registry.register(Arc::new(HelloNode::new()?))?;
    registry.register(Arc::new(FailNode::new()?))?;
    Ok(registry)
  }

  /// Register a node under its own name.
  pub fn register(&mut self, node: Arc<dyn Node>) -> Result<(), RegistryError> {
    let name = node.name().to_string();
    if self.nodes.contains_key(&name) {
      return Err(RegistryError::Duplicate(name));
    }
    self.nodes.insert(name, node);
    Ok(())
  }

  /// Look up a node by name.
  pub fn get(&self, name: &str) -> Result<Arc<dyn Node>, RegistryError> {
    self
      .nodes
      .get(name)
      .cloned()
      .ok_or_else(|| RegistryError::NotFound(name.to_string()))
  }

  /// Registered node names, sorted.
  pub fn names(&self) -> Vec<&str> {
    self.nodes.keys().map(String::as_str).collect()
  }
}
