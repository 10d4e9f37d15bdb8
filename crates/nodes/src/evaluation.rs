//! `EvaluationNode`: records evaluation outcomes on the platform.
//!
//! Two operations:
//! - `logResult`: store a dataset row's output (and scores) under an experiment.
//! - `scoreTrace`: attach a named score to an existing trace.
//!
//! With `operation: "auto"` the node picks one from the incoming item: rows
//! emitted by a dataset trigger carry `row_id`, traced outputs carry
//! `traceId`. Items coming from a dataset trigger also get their batch
//! position copied into `_batch` so downstream steps can detect the last row.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use client::models::{ExperimentResultCreate, ScoreCreate};
use engine::Progress;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::items::{first_item, str_field, usize_field};
use crate::traits::ExecutionContext;
use crate::{EvalPlatform, ExecutableNode, NodeError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvaluationOperation {
    #[default]
    Auto,
    LogResult,
    ScoreTrace,
}

fn default_score_name() -> String {
    "score".into()
}
fn default_output_field() -> String {
    "output".into()
}
fn default_expected_field() -> String {
    "expected".into()
}
fn default_scores_field() -> String {
    "scores".into()
}
fn default_value_field() -> String {
    "score".into()
}

/// Parameters of an evaluation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationParams {
    #[serde(default)]
    pub operation: EvaluationOperation,
    /// Experiment that `logResult` writes into.
    #[serde(default)]
    pub experiment: Option<String>,
    /// Score name used by `scoreTrace`.
    #[serde(default = "default_score_name")]
    pub score_name: String,
    #[serde(default = "default_output_field")]
    pub output_field: String,
    #[serde(default = "default_expected_field")]
    pub expected_field: String,
    #[serde(default = "default_scores_field")]
    pub scores_field: String,
    /// Item field holding the `scoreTrace` value.
    #[serde(default = "default_value_field")]
    pub value_field: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl EvaluationParams {
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.operation == EvaluationOperation::LogResult && self.experiment().is_none() {
            return Err(NodeError::fatal("logResult requires an experiment name"));
        }
        if self.score_name.trim().is_empty() {
            return Err(NodeError::fatal("scoreName must not be empty"));
        }
        Ok(())
    }

    fn experiment(&self) -> Option<&str> {
        self.experiment.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Batch position of an item emitted by a dataset trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchContext {
    pub row_number: usize,
    pub rows_left: usize,
    pub is_last_row: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl BatchContext {
    pub fn from_item(item: &Map<String, Value>) -> Option<Self> {
        let row_number = usize_field(item, "row_number")?;
        let rows_left = usize_field(item, "_rowsLeft")?;
        let progress = item
            .get("_progress")
            .and_then(|p| serde_json::from_value(p.clone()).ok());
        Some(Self {
            row_number,
            rows_left,
            is_last_row: rows_left == 0,
            progress,
        })
    }
}

/// Operation to run for `item` under the configured `operation`.
pub fn detect_operation(
    configured: EvaluationOperation,
    item: &Map<String, Value>,
) -> Result<EvaluationOperation, NodeError> {
    match configured {
        EvaluationOperation::Auto if item.contains_key("row_id") => Ok(EvaluationOperation::LogResult),
        EvaluationOperation::Auto if item.contains_key("traceId") => Ok(EvaluationOperation::ScoreTrace),
        EvaluationOperation::Auto => Err(NodeError::fatal(
            "cannot detect evaluation operation: item has neither 'row_id' nor 'traceId'",
        )),
        explicit => Ok(explicit),
    }
}

pub struct EvaluationNode<P: ?Sized> {
    platform: Arc<P>,
    params: EvaluationParams,
}

impl<P: EvalPlatform + ?Sized> EvaluationNode<P> {
    pub fn new(platform: Arc<P>, params: EvaluationParams) -> Result<Self, NodeError> {
        params.validate()?;
        Ok(Self { platform, params })
    }

    pub fn from_params(platform: Arc<P>, params: &Value) -> Result<Self, NodeError> {
        let params: EvaluationParams = serde_json::from_value(params.clone())
            .map_err(|e| NodeError::fatal(format!("invalid evaluation parameters: {e}")))?;
        Self::new(platform, params)
    }

    async fn log_result(&self, item: &Map<String, Value>) -> Result<Value, NodeError> {
        let experiment = self
            .params
            .experiment()
            .ok_or_else(|| NodeError::fatal("logResult requires an experiment name"))?;
        let row_id = str_field(item, "row_id")
            .ok_or_else(|| NodeError::fatal("logResult requires a 'row_id' field"))?;
        let dataset_id = str_field(item, "datasetId")
            .ok_or_else(|| NodeError::fatal("logResult requires a 'datasetId' field"))?;
        let output = item.get(&self.params.output_field).cloned().ok_or_else(|| {
            NodeError::fatal(format!("item has no '{}' field to log", self.params.output_field))
        })?;

        let entry = item.get("entry").cloned().unwrap_or(Value::Null);
        let expected = item
            .get(&self.params.expected_field)
            .or_else(|| entry.get("expected"))
            .cloned()
            .unwrap_or(Value::Null);
        let scores = parse_scores(item.get(&self.params.scores_field))?;

        let body = ExperimentResultCreate {
            row_id: row_id.to_owned(),
            dataset_id: dataset_id.to_owned(),
            input: entry,
            output,
            expected,
            scores: scores.clone(),
            metadata: self.params.metadata.clone(),
        };
        let created = self.platform.log_experiment_result(experiment, &body).await?;
        debug!("logged row {} into experiment '{}' as {}", row_id, experiment, created.id);

        Ok(json!({
            "operation": "logResult",
            "experiment": experiment,
            "resultId": created.id,
            "row_id": row_id,
            "datasetId": dataset_id,
            "scores": scores,
        }))
    }

    async fn score_trace(&self, item: &Map<String, Value>) -> Result<Value, NodeError> {
        let trace_id = str_field(item, "traceId")
            .ok_or_else(|| NodeError::fatal("scoreTrace requires a 'traceId' field"))?;
        let value = match item.get(&self.params.value_field) {
            Some(v @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => v.clone(),
            Some(other) => {
                return Err(NodeError::fatal(format!(
                    "score value '{}' must be a number, boolean or string, got {other}",
                    self.params.value_field
                )))
            }
            None => {
                return Err(NodeError::fatal(format!(
                    "item has no '{}' field to score",
                    self.params.value_field
                )))
            }
        };

        let score = ScoreCreate {
            trace_id: trace_id.to_owned(),
            observation_id: str_field(item, "observationId").map(str::to_owned),
            name: self.params.score_name.clone(),
            value: value.clone(),
            comment: self.params.comment.clone(),
        };
        let created = self.platform.create_score(&score).await?;
        debug!("scored trace {} ({} = {})", trace_id, score.name, value);

        Ok(json!({
            "operation": "scoreTrace",
            "scoreId": created.id,
            "traceId": trace_id,
            "name": score.name,
            "value": value,
        }))
    }
}

fn parse_scores(raw: Option<&Value>) -> Result<BTreeMap<String, f64>, NodeError> {
    let Some(raw) = raw else {
        return Ok(BTreeMap::new());
    };
    let Some(map) = raw.as_object() else {
        return Err(NodeError::fatal("scores must be an object of numbers"));
    };
    map.iter()
        .map(|(name, v)| {
            v.as_f64()
                .map(|n| (name.clone(), n))
                .ok_or_else(|| NodeError::fatal(format!("score '{name}' is not a number")))
        })
        .collect()
}

#[async_trait]
impl<P: EvalPlatform + ?Sized + 'static> ExecutableNode for EvaluationNode<P> {
    #[instrument(skip(self, input, ctx), fields(node_id = %ctx.node_id))]
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let item = first_item(&input)
            .ok_or_else(|| NodeError::fatal("evaluation node expects a JSON object item"))?;

        let mut output = match detect_operation(self.params.operation, item)? {
            EvaluationOperation::LogResult => self.log_result(item).await?,
            EvaluationOperation::ScoreTrace => self.score_trace(item).await?,
            EvaluationOperation::Auto => {
                return Err(NodeError::fatal("evaluation operation could not be resolved"))
            }
        };

        if let (Some(batch), Some(out)) = (BatchContext::from_item(item), output.as_object_mut()) {
            out.insert("_batch".into(), serde_json::to_value(batch)?);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use engine::MemoryStore;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("eval-1", Arc::new(MemoryStore::new()))
    }

    fn trigger_item(rows_left: usize) -> Value {
        json!({
            "row_number": 3,
            "_rowsLeft": rows_left,
            "_progress": { "current": 4, "total": 4, "percentage": 100, "remaining": 0 },
            "row_id": "r3",
            "datasetId": "ds1",
            "projectId": "proj-1",
            "entry": { "input": "2+2?", "expected": "4" },
            "output": "4",
            "scores": { "exact_match": 1.0 }
        })
    }

    #[test]
    fn auto_detects_from_item_shape() {
        let row = json!({ "row_id": "r1" });
        let trace = json!({ "traceId": "t1" });
        let neither = json!({ "foo": 1 });

        assert_eq!(
            detect_operation(EvaluationOperation::Auto, row.as_object().unwrap()).unwrap(),
            EvaluationOperation::LogResult
        );
        assert_eq!(
            detect_operation(EvaluationOperation::Auto, trace.as_object().unwrap()).unwrap(),
            EvaluationOperation::ScoreTrace
        );
        assert!(detect_operation(EvaluationOperation::Auto, neither.as_object().unwrap()).is_err());
        assert_eq!(
            detect_operation(EvaluationOperation::ScoreTrace, row.as_object().unwrap()).unwrap(),
            EvaluationOperation::ScoreTrace
        );
    }

    #[test]
    fn log_result_without_experiment_is_rejected() {
        let platform = Arc::new(MockPlatform::new());
        assert!(EvaluationNode::from_params(platform, &json!({ "operation": "logResult" })).is_err());
    }

    #[tokio::test]
    async fn trigger_rows_are_logged_with_batch_context() {
        let platform = Arc::new(MockPlatform::new());
        let node = EvaluationNode::from_params(platform.clone(), &json!({ "experiment": "nightly" })).unwrap();

        let out = node.execute(trigger_item(0), &ctx()).await.unwrap();

        assert_eq!(out["operation"], "logResult");
        assert_eq!(out["resultId"], "mock-1");
        assert_eq!(out["_batch"]["rowNumber"], 3);
        assert_eq!(out["_batch"]["isLastRow"], true);
        assert_eq!(out["_batch"]["progress"]["percentage"], 100);

        let results = platform.results.lock().unwrap();
        let (experiment, body) = &results[0];
        assert_eq!(experiment, "nightly");
        assert_eq!(body.row_id, "r3");
        assert_eq!(body.input["input"], "2+2?");
        assert_eq!(body.expected, json!("4"), "falls back to entry.expected");
        assert_eq!(body.scores.get("exact_match"), Some(&1.0));
    }

    #[tokio::test]
    async fn non_numeric_scores_are_rejected() {
        let platform = Arc::new(MockPlatform::new());
        let node = EvaluationNode::from_params(platform.clone(), &json!({ "experiment": "e" })).unwrap();
        let mut item = trigger_item(2);
        item["scores"] = json!({ "judge": "good" });

        let err = node.execute(item, &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Fatal(ref m) if m.contains("judge")));
        assert!(platform.results.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn traces_are_scored() {
        let platform = Arc::new(MockPlatform::new());
        let node = EvaluationNode::from_params(
            platform.clone(),
            &json!({ "scoreName": "helpfulness", "comment": "judge v2" }),
        )
        .unwrap();

        let out = node
            .execute(json!([{ "json": { "traceId": "t-9", "score": 0.75 } }]), &ctx())
            .await
            .unwrap();

        assert_eq!(out["operation"], "scoreTrace");
        assert_eq!(out["value"], 0.75);
        assert!(out.get("_batch").is_none());

        let scores = platform.scores.lock().unwrap();
        assert_eq!(scores[0].trace_id, "t-9");
        assert_eq!(scores[0].name, "helpfulness");
        assert_eq!(scores[0].comment.as_deref(), Some("judge v2"));
    }

    #[tokio::test]
    async fn missing_score_value_is_fatal() {
        let platform = Arc::new(MockPlatform::new());
        let node = EvaluationNode::from_params(platform, &json!({})).unwrap();
        let err = node.execute(json!({ "traceId": "t1" }), &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Fatal(ref m) if m.contains("'score'")));
    }

    #[tokio::test]
    async fn transient_platform_errors_are_retryable() {
        let platform = Arc::new(MockPlatform::new().failing_writes(503));
        let node = EvaluationNode::from_params(platform, &json!({ "experiment": "e" })).unwrap();
        let err = node.execute(trigger_item(1), &ctx()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
