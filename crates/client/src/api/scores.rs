//! Trace scoring.

use tracing::instrument;

use crate::{
    models::{Created, ScoreCreate},
    ClientError, PlatformClient,
};

/// Attach a score to a trace (or one of its observations).
#[instrument(skip(client, score), fields(trace_id = %score.trace_id, name = %score.name))]
pub async fn create_score(client: &PlatformClient, score: &ScoreCreate) -> Result<Created, ClientError> {
    client.post_json("/api/v1/scores", score).await
}
