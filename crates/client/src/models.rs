//! Wire models for the platform's public API.
//!
//! These are *transport* models: field names follow the platform's camelCase
//! JSON, and they carry no workflow behaviour.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// datasets
// ---------------------------------------------------------------------------

/// One row of a remote dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRow {
    pub id: String,
    #[serde(alias = "collectionId")]
    pub dataset_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Opaque row payload, passed through untouched.
    #[serde(default)]
    pub entry: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// prompts
// ---------------------------------------------------------------------------

/// How a stored prompt is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Text,
    Chat,
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// A single message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Template body: a plain string for text prompts, a message list for chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptTemplate {
    Text(String),
    Chat(Vec<ChatMessage>),
}

/// A managed prompt version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub slug: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub template: PromptTemplate,
    /// Model parameters attached to the prompt (model name, temperature, …).
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Which version of a prompt to resolve. Empty means the production version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl std::fmt::Display for PromptSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.version, &self.label) {
            (Some(v), _) => write!(f, "v{v}"),
            (None, Some(label)) => write!(f, "label:{label}"),
            (None, None) => write!(f, "production"),
        }
    }
}

// ---------------------------------------------------------------------------
// scores
// ---------------------------------------------------------------------------

/// Request body for attaching a score to a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCreate {
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    pub name: String,
    /// Numeric, boolean or categorical value.
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// experiments
// ---------------------------------------------------------------------------

/// Request body for recording one evaluated dataset row in an experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResultCreate {
    pub row_id: String,
    pub dataset_id: String,
    pub input: Value,
    pub output: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub expected: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Identifier returned by create endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Created {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dataset_row_accepts_collection_id_alias_and_missing_provenance() {
        let row: DatasetRow = serde_json::from_value(json!({
            "id": "r1",
            "collectionId": "ds1",
            "entry": { "question": "2+2?" }
        }))
        .unwrap();

        assert_eq!(row.dataset_id, "ds1");
        assert_eq!(row.project_id, None);
        assert_eq!(row.created_at, None);
        assert_eq!(row.entry["question"], "2+2?");
    }

    #[test]
    fn chat_prompt_template_deserializes_as_messages() {
        let prompt: Prompt = serde_json::from_value(json!({
            "id": "p1",
            "slug": "greeter",
            "version": 3,
            "type": "chat",
            "template": [{ "role": "system", "content": "Hi {{ name }}" }],
            "labels": ["production"]
        }))
        .unwrap();

        assert_eq!(prompt.kind, PromptKind::Chat);
        assert!(matches!(prompt.template, PromptTemplate::Chat(ref m) if m.len() == 1));
        assert_eq!(prompt.config, Value::Null);
    }

    #[test]
    fn experiment_result_omits_empty_optional_fields() {
        let body = ExperimentResultCreate {
            row_id: "r1".into(),
            dataset_id: "ds1".into(),
            input: json!({ "q": 1 }),
            output: json!("4"),
            expected: Value::Null,
            scores: BTreeMap::new(),
            metadata: Value::Null,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["rowId"], "r1");
        assert!(v.get("expected").is_none());
        assert!(v.get("scores").is_none());
        assert!(v.get("metadata").is_none());
    }

    #[test]
    fn selector_display() {
        assert_eq!(PromptSelector::default().to_string(), "production");
        assert_eq!(PromptSelector { version: Some(2), label: None }.to_string(), "v2");
        assert_eq!(
            PromptSelector { version: None, label: Some("staging".into()) }.to_string(),
            "label:staging"
        );
    }
}
