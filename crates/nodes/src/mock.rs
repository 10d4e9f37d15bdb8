//! `MockPlatform`: a test double for `EvalPlatform`.
//!
//! Useful in unit and integration tests where a live platform is either
//! unavailable or irrelevant. Every write is recorded for later assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use client::models::{Created, DatasetRow, ExperimentResultCreate, Prompt, PromptSelector, ScoreCreate};
use client::ClientError;
use engine::mock::StaticSource;
use engine::CollectionSource;

use crate::EvalPlatform;

/// An in-memory platform that serves canned datasets and prompts.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    /// Dataset responses (shared with the cursor tests).
    pub datasets: StaticSource,
    prompts: Arc<Mutex<HashMap<String, Prompt>>>,
    /// When set, every write fails with this HTTP status.
    fail_writes: Option<u16>,
    /// Prompt lookups, in call order.
    pub prompt_calls: Arc<Mutex<Vec<(String, PromptSelector)>>>,
    /// Scores posted, in call order.
    pub scores: Arc<Mutex<Vec<ScoreCreate>>>,
    /// Experiment results posted, with their experiment name.
    pub results: Arc<Mutex<Vec<(String, ExperimentResultCreate)>>>,
}

impl MockPlatform {
    /// A platform serving `rows` for every dataset.
    pub fn with_rows(rows: Vec<DatasetRow>) -> Self {
        Self {
            datasets: StaticSource::with_rows(rows),
            prompts: Arc::new(Mutex::new(HashMap::new())),
            fail_writes: None,
            prompt_calls: Arc::new(Mutex::new(Vec::new())),
            scores: Arc::new(Mutex::new(Vec::new())),
            results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Serve `prompt` for its slug, whatever version or label is asked for.
    pub fn with_prompt(self, prompt: Prompt) -> Self {
        self.prompts.lock().unwrap().insert(prompt.slug.clone(), prompt);
        self
    }

    /// Make every write fail with `status`.
    pub fn failing_writes(mut self, status: u16) -> Self {
        self.fail_writes = Some(status);
        self
    }

    pub fn prompt_call_count(&self) -> usize {
        self.prompt_calls.lock().unwrap().len()
    }

    fn write_result(&self, path: &str, next_id: usize) -> Result<Created, ClientError> {
        match self.fail_writes {
            Some(status) => Err(ClientError::Status {
                status,
                path: path.to_owned(),
                body: "mock failure".into(),
            }),
            None => Ok(Created { id: format!("mock-{next_id}") }),
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollectionSource for MockPlatform {
    async fn fetch_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<DatasetRow>>, ClientError> {
        self.datasets.fetch_collection(collection_id).await
    }
}

#[async_trait]
impl EvalPlatform for MockPlatform {
    async fn get_prompt(&self, slug: &str, selector: &PromptSelector) -> Result<Prompt, ClientError> {
        self.prompt_calls
            .lock()
            .unwrap()
            .push((slug.to_owned(), selector.clone()));

        self.prompts
            .lock()
            .unwrap()
            .get(slug)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("/api/v1/prompts/{slug}")))
    }

    async fn create_score(&self, score: &ScoreCreate) -> Result<Created, ClientError> {
        let mut scores = self.scores.lock().unwrap();
        let created = self.write_result("/api/v1/scores", scores.len() + 1)?;
        scores.push(score.clone());
        Ok(created)
    }

    async fn log_experiment_result(
        &self,
        experiment: &str,
        result: &ExperimentResultCreate,
    ) -> Result<Created, ClientError> {
        let mut results = self.results.lock().unwrap();
        let path = format!("/api/v1/experiments/{experiment}/results");
        let created = self.write_result(&path, results.len() + 1)?;
        results.push((experiment.to_owned(), result.clone()));
        Ok(created)
    }
}
