//! Blok Nodes
//!
//! Built-in nodes shipped with blok and the [`NodeRegistry`] used to look
//! nodes up by name.
//!
//! - [`HelloNode`] (`hello`): the project starter node, echoes a message
//! - [`FailNode`] (`fail`): reports a configured business error

mod error;
mod fail;
mod hello;
mod registry;

pub use error::RegistryError;
pub use fail::FailNode;
pub use hello::HelloNode;
pub use registry::NodeRegistry;
