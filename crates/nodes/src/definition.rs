//! Node definitions and the factory that turns them into executable nodes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset_trigger::DatasetTriggerNode;
use crate::evaluation::EvaluationNode;
use crate::prompt::PromptNode;
use crate::resumable_trigger::ResumableDatasetTriggerNode;
use crate::{EvalPlatform, ExecutableNode, NodeError};

pub const DATASET_TRIGGER: &str = "datasetTrigger";
pub const DATASET_RESUMABLE_TRIGGER: &str = "datasetResumableTrigger";
pub const EVALUATION: &str = "evaluation";
pub const PROMPT: &str = "prompt";

pub const NODE_TYPES: [&str; 4] = [DATASET_TRIGGER, DATASET_RESUMABLE_TRIGGER, EVALUATION, PROMPT];

// ---------------------------------------------------------------------------
// NodeDefinition
// ---------------------------------------------------------------------------

/// A configured node instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Stable identity of the instance; scopes everything it persists.
    pub id: String,
    /// One of [`NODE_TYPES`].
    #[serde(alias = "type")]
    pub node_type: String,
    /// Node parameters, as entered in the host UI.
    #[serde(default)]
    pub config: Value,
}

/// Maps node ids to their built implementations.
pub type NodeRegistry = HashMap<String, Arc<dyn ExecutableNode>>;

/// Build the node described by `def`.
///
/// # Errors
/// [`NodeError::Fatal`] for an unknown `node_type` or invalid parameters.
pub fn build_node<P>(def: &NodeDefinition, platform: Arc<P>) -> Result<Arc<dyn ExecutableNode>, NodeError>
where
    P: EvalPlatform + ?Sized + 'static,
{
    let node: Arc<dyn ExecutableNode> = match def.node_type.as_str() {
        DATASET_TRIGGER => Arc::new(DatasetTriggerNode::from_params(platform, &def.config)?),
        DATASET_RESUMABLE_TRIGGER => Arc::new(ResumableDatasetTriggerNode::from_params(platform, &def.config)?),
        EVALUATION => Arc::new(EvaluationNode::from_params(platform, &def.config)?),
        PROMPT => Arc::new(PromptNode::from_params(platform, &def.config)?),
        other => {
            return Err(NodeError::fatal(format!(
                "unknown node type '{other}' (expected one of: {})",
                NODE_TYPES.join(", ")
            )))
        }
    };
    Ok(node)
}

/// Build every definition, rejecting duplicate ids.
pub fn build_registry<P>(defs: &[NodeDefinition], platform: Arc<P>) -> Result<NodeRegistry, NodeError>
where
    P: EvalPlatform + ?Sized + 'static,
{
    let mut seen: HashSet<&str> = HashSet::new();
    for def in defs {
        if !seen.insert(def.id.as_str()) {
            return Err(NodeError::fatal(format!("duplicate node id '{}'", def.id)));
        }
    }

    defs.iter()
        .map(|def| Ok((def.id.clone(), build_node(def, platform.clone())?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use crate::traits::ExecutionContext;
    use engine::mock::sample_rows;
    use engine::MemoryStore;
    use serde_json::json;

    fn def(id: &str, node_type: &str, config: Value) -> NodeDefinition {
        NodeDefinition { id: id.into(), node_type: node_type.into(), config }
    }

    #[test]
    fn definitions_accept_type_alias() {
        let def: NodeDefinition =
            serde_json::from_value(json!({ "id": "t1", "type": "datasetTrigger", "config": {} })).unwrap();
        assert_eq!(def.node_type, DATASET_TRIGGER);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let platform = Arc::new(MockPlatform::new());
        let err = build_node(&def("x", "webhook", Value::Null), platform).err().unwrap();
        assert!(matches!(err, NodeError::Fatal(ref m) if m.contains("webhook")));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let platform = Arc::new(MockPlatform::new());
        assert!(build_node(&def("t", DATASET_TRIGGER, json!({})), platform.clone()).is_err());
        assert!(build_node(&def("p", PROMPT, json!({ "promptSlug": "" })), platform).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let platform = Arc::new(MockPlatform::new());
        let defs = vec![
            def("a", EVALUATION, json!({})),
            def("a", PROMPT, json!({ "promptSlug": "s" })),
        ];
        let err = build_registry(&defs, platform).err().unwrap();
        assert!(matches!(err, NodeError::Fatal(ref m) if m.contains("'a'")));
    }

    #[tokio::test]
    async fn built_trigger_runs_through_trait_object() {
        let platform = Arc::new(MockPlatform::with_rows(sample_rows("ds1", 2)));
        let defs = vec![def("t1", DATASET_RESUMABLE_TRIGGER, json!({ "collectionId": "ds1" }))];
        let registry = build_registry(&defs, platform).unwrap();
        let ctx = ExecutionContext::new("t1", Arc::new(MemoryStore::new()));

        let out = registry["t1"].execute(Value::Null, &ctx).await.unwrap();
        assert_eq!(out["row_id"], "r0");
    }
}
