//! `nodes` crate: the `ExecutableNode` trait and the evaluation platform nodes.
//!
//! Every node implements [`ExecutableNode`]; the host dispatches execution
//! through this trait object. Nodes reach the platform through
//! [`EvalPlatform`] and persist state through the context's scope store.

pub mod dataset_trigger;
pub mod definition;
pub mod error;
pub mod evaluation;
pub mod items;
pub mod mock;
pub mod platform;
pub mod prompt;
pub mod resumable_trigger;
pub mod traits;

pub use definition::{build_node, build_registry, NodeDefinition, NodeRegistry};
pub use error::NodeError;
pub use platform::EvalPlatform;
pub use traits::{ExecutableNode, ExecutionContext};
