//! The `ExecutableNode` trait: the contract every node must fulfil.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use engine::ScopeStore;
use serde_json::Value;
use uuid::Uuid;

use crate::NodeError;

/// Shared context passed to every node during execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: Uuid,
    /// ID of the current execution run.
    pub execution_id: Uuid,
    /// Identity of the node instance; scopes everything the node persists.
    pub node_id: String,
    /// Initial input supplied when the execution was triggered.
    pub input: Value,
    /// Decrypted secrets scoped to this workflow.
    pub secrets: HashMap<String, String>,
    /// Host-managed storage that survives between executions.
    pub store: Arc<dyn ScopeStore>,
}

impl ExecutionContext {
    /// Context for a fresh execution of `node_id` with no initial input.
    pub fn new(node_id: impl Into<String>, store: Arc<dyn ScopeStore>) -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
            node_id: node_id.into(),
            input: Value::Null,
            secrets: HashMap::new(),
            store,
        }
    }
}

/// The core node trait.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node, receive the *previous* step's JSON output as `input`,
    /// and return this node's JSON output.
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError>;
}
