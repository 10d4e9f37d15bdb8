//! `StaticSource`: a test double for `CollectionSource`.
//!
//! Serves canned rows (or a canned failure) and records every fetch, so tests
//! can assert when the cursor went back to the network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use client::models::DatasetRow;
use client::ClientError;
use serde_json::json;

use crate::CollectionSource;

/// What `StaticSource` answers with.
#[derive(Debug, Clone)]
pub enum SourceBehaviour {
    /// Respond with these rows.
    Rows(Vec<DatasetRow>),
    /// Respond without a usable `data` sequence.
    NoData,
    /// Fail with an HTTP status.
    FailStatus(u16),
}

#[derive(Debug, Clone)]
pub struct StaticSource {
    behaviour: Arc<Mutex<SourceBehaviour>>,
    /// Collection ids requested, in call order.
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl StaticSource {
    pub fn new(behaviour: SourceBehaviour) -> Self {
        Self {
            behaviour: Arc::new(Mutex::new(behaviour)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_rows(rows: Vec<DatasetRow>) -> Self {
        Self::new(SourceBehaviour::Rows(rows))
    }

    /// Change the answer for subsequent fetches.
    pub fn set_behaviour(&self, behaviour: SourceBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// Number of fetches performed so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CollectionSource for StaticSource {
    async fn fetch_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<DatasetRow>>, ClientError> {
        self.calls.lock().unwrap().push(collection_id.to_owned());

        match &*self.behaviour.lock().unwrap() {
            SourceBehaviour::Rows(rows) => Ok(Some(rows.clone())),
            SourceBehaviour::NoData => Ok(None),
            SourceBehaviour::FailStatus(status) => Err(ClientError::Status {
                status: *status,
                path: format!("/api/v1/datasets/{collection_id}/rows"),
                body: "mock failure".into(),
            }),
        }
    }
}

/// `n` rows `r0..r{n-1}` of `dataset_id`, each with `entry.index == i`.
pub fn sample_rows(dataset_id: &str, n: usize) -> Vec<DatasetRow> {
    (0..n)
        .map(|i| DatasetRow {
            id: format!("r{i}"),
            dataset_id: dataset_id.to_owned(),
            project_id: Some("proj-1".into()),
            entry: json!({ "index": i, "input": format!("question {i}") }),
            created_at: None,
            updated_at: None,
        })
        .collect()
}
