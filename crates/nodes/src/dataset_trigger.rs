//! `DatasetTriggerNode`: emits one dataset row per execution, stepping from
//! its own previous output.
//!
//! The host feeds the node's last output back in as `input`; the next
//! position is `row_number + 1` while `_rowsLeft` is non-zero, otherwise the
//! walk starts over at row 0. The snapshot itself is cached in the scope
//! store so repeated executions do not refetch the dataset.

use std::sync::Arc;

use async_trait::async_trait;
use engine::cursor::scope_key;
use engine::{CursorConfig, CursorMode, DatasetCursor};
use serde_json::Value;
use tracing::instrument;

use crate::items::{first_item, usize_field};
use crate::traits::ExecutionContext;
use crate::{EvalPlatform, ExecutableNode, NodeError};

pub struct DatasetTriggerNode<P: ?Sized> {
    platform: Arc<P>,
    config: CursorConfig,
}

impl<P: EvalPlatform + ?Sized> DatasetTriggerNode<P> {
    /// `resetProgress` belongs to the resumable trigger and is ignored here.
    pub fn new(platform: Arc<P>, mut config: CursorConfig) -> Self {
        config.reset_progress = false;
        Self { platform, config }
    }

    pub fn from_params(platform: Arc<P>, params: &Value) -> Result<Self, NodeError> {
        Ok(Self::new(platform, CursorConfig::from_params(params)?))
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }
}

/// Cursor implied by the node's previous output, if it left rows to emit.
pub fn previous_cursor(input: &Value) -> Option<usize> {
    let item = first_item(input)?;
    let row_number = usize_field(item, "row_number")?;
    let rows_left = usize_field(item, "_rowsLeft")?;
    if rows_left == 0 {
        return None;
    }
    row_number.checked_add(1)
}

#[async_trait]
impl<P: EvalPlatform + ?Sized + 'static> ExecutableNode for DatasetTriggerNode<P> {
    #[instrument(skip(self, input, ctx), fields(node_id = %ctx.node_id))]
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let mode = CursorMode::Stepwise {
            previous_cursor: previous_cursor(&input),
        };
        let cursor = DatasetCursor::new(
            self.platform.as_ref(),
            ctx.store.as_ref(),
            scope_key(&ctx.node_id),
        );
        let row = cursor.next_row(&self.config, mode).await?;
        Ok(serde_json::to_value(row)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use engine::mock::sample_rows;
    use engine::MemoryStore;
    use serde_json::json;

    fn node(rows: usize, params: Value) -> (Arc<MockPlatform>, DatasetTriggerNode<MockPlatform>) {
        let platform = Arc::new(MockPlatform::with_rows(sample_rows("ds1", rows)));
        let node = DatasetTriggerNode::from_params(platform.clone(), &params).unwrap();
        (platform, node)
    }

    #[test]
    fn previous_cursor_reads_last_emission() {
        assert_eq!(previous_cursor(&json!({ "row_number": 2, "_rowsLeft": 5 })), Some(3));
        assert_eq!(previous_cursor(&json!({ "row_number": 7, "_rowsLeft": 0 })), None);
        assert_eq!(previous_cursor(&json!([{ "json": { "row_number": 0, "_rowsLeft": 1 } }])), Some(1));
        assert_eq!(previous_cursor(&json!({ "unrelated": true })), None);
        assert_eq!(previous_cursor(&Value::Null), None);
    }

    #[test]
    fn overflowing_row_number_restarts_the_walk() {
        let input = json!({ "row_number": u64::MAX, "_rowsLeft": 1 });
        assert_eq!(previous_cursor(&input), None);
    }

    #[test]
    fn reset_flag_is_ignored() {
        let (_, node) = node(3, json!({ "collectionId": "ds1", "resetProgress": true }));
        assert!(!node.config().reset_progress);
    }

    #[tokio::test]
    async fn feeding_output_back_walks_the_dataset() {
        let (platform, node) = node(3, json!({ "collectionId": "ds1" }));
        let ctx = ExecutionContext::new("trigger-1", Arc::new(MemoryStore::new()));

        let mut input = Value::Null;
        let mut ids = Vec::new();
        for _ in 0..4 {
            let out = node.execute(input, &ctx).await.unwrap();
            ids.push(out["row_id"].as_str().unwrap().to_owned());
            input = out;
        }

        assert_eq!(ids, vec!["r0", "r1", "r2", "r0"]);
        assert_eq!(platform.datasets.call_count(), 1);
    }

    #[tokio::test]
    async fn output_carries_progress_and_provenance() {
        let (_, node) = node(4, json!({ "collectionId": "ds1", "limitRows": true, "maxRows": 2 }));
        let ctx = ExecutionContext::new("trigger-1", Arc::new(MemoryStore::new()));

        let out = node.execute(Value::Null, &ctx).await.unwrap();
        assert_eq!(out["row_number"], 0);
        assert_eq!(out["_rowsLeft"], 1);
        assert_eq!(out["_progress"]["percentage"], 50);
        assert_eq!(out["datasetId"], "ds1");
        assert_eq!(out["projectId"], "proj-1");
        assert_eq!(out["entry"]["index"], 0);
    }

    #[tokio::test]
    async fn empty_dataset_is_fatal() {
        let (_, node) = node(0, json!({ "collectionId": "ds1" }));
        let ctx = ExecutionContext::new("trigger-1", Arc::new(MemoryStore::new()));

        let err = node.execute(Value::Null, &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Fatal(ref m) if m.contains("ds1")));
    }

    #[test]
    fn missing_collection_is_rejected_at_build_time() {
        let platform = Arc::new(MockPlatform::new());
        assert!(DatasetTriggerNode::from_params(platform, &json!({ "startRow": 1 })).is_err());
    }
}
