//! `ResumableDatasetTriggerNode`: emits one dataset row per execution,
//! resuming from a cursor persisted in the scope store.
//!
//! Set `resetProgress` to start over from row 0 with a freshly fetched
//! (and, if configured, reshuffled) snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use engine::cursor::scope_key;
use engine::{CursorConfig, CursorMode, DatasetCursor};
use serde_json::Value;
use tracing::instrument;

use crate::traits::ExecutionContext;
use crate::{EvalPlatform, ExecutableNode, NodeError};

pub struct ResumableDatasetTriggerNode<P: ?Sized> {
    platform: Arc<P>,
    config: CursorConfig,
}

impl<P: EvalPlatform + ?Sized> ResumableDatasetTriggerNode<P> {
    pub fn new(platform: Arc<P>, config: CursorConfig) -> Self {
        Self { platform, config }
    }

    pub fn from_params(platform: Arc<P>, params: &Value) -> Result<Self, NodeError> {
        Ok(Self::new(platform, CursorConfig::from_params(params)?))
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }
}

#[async_trait]
impl<P: EvalPlatform + ?Sized + 'static> ExecutableNode for ResumableDatasetTriggerNode<P> {
    #[instrument(skip(self, _input, ctx), fields(node_id = %ctx.node_id))]
    async fn execute(&self, _input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let cursor = DatasetCursor::new(
            self.platform.as_ref(),
            ctx.store.as_ref(),
            scope_key(&ctx.node_id),
        );
        let row = cursor.next_row(&self.config, CursorMode::Resumable).await?;
        Ok(serde_json::to_value(row)?)
    }
}
