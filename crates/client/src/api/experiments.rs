//! Experiment result logging.

use tracing::instrument;

use crate::{
    models::{Created, ExperimentResultCreate},
    ClientError, PlatformClient,
};

pub(crate) fn results_path(experiment: &str) -> String {
    format!("/api/v1/experiments/{experiment}/results")
}

/// Record the evaluated output for one dataset row under `experiment`.
///
/// The platform creates the experiment on first use.
#[instrument(skip(client, result), fields(row_id = %result.row_id))]
pub async fn log_experiment_result(
    client: &PlatformClient,
    experiment: &str,
    result: &ExperimentResultCreate,
) -> Result<Created, ClientError> {
    client.post_json(&results_path(experiment), result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_path_embeds_experiment() {
        assert_eq!(results_path("nightly"), "/api/v1/experiments/nightly/results");
    }
}
