//! Platform operations the nodes depend on.

use async_trait::async_trait;
use client::models::{Created, ExperimentResultCreate, Prompt, PromptSelector, ScoreCreate};
use client::{api, ClientError, PlatformClient};
use engine::CollectionSource;

/// Everything the nodes need from the evaluation platform.
///
/// Implemented for [`PlatformClient`]; tests use [`crate::mock::MockPlatform`].
#[async_trait]
pub trait EvalPlatform: CollectionSource {
    async fn get_prompt(&self, slug: &str, selector: &PromptSelector) -> Result<Prompt, ClientError>;

    async fn create_score(&self, score: &ScoreCreate) -> Result<Created, ClientError>;

    async fn log_experiment_result(
        &self,
        experiment: &str,
        result: &ExperimentResultCreate,
    ) -> Result<Created, ClientError>;
}

#[async_trait]
impl EvalPlatform for PlatformClient {
    async fn get_prompt(&self, slug: &str, selector: &PromptSelector) -> Result<Prompt, ClientError> {
        api::prompts::get_prompt(self, slug, selector).await
    }

    async fn create_score(&self, score: &ScoreCreate) -> Result<Created, ClientError> {
        api::scores::create_score(self, score).await
    }

    async fn log_experiment_result(
        &self,
        experiment: &str,
        result: &ExperimentResultCreate,
    ) -> Result<Created, ClientError> {
        api::experiments::log_experiment_result(self, experiment, result).await
    }
}
