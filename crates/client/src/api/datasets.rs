//! Dataset row retrieval.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::{models::DatasetRow, ClientError, PlatformClient};

pub(crate) fn rows_path(slug: &str) -> String {
    format!("/api/v1/datasets/{slug}/rows")
}

/// Fetch every row of the dataset identified by `slug`.
///
/// Returns `Ok(None)` when the response body has no `data` array, so callers
/// can tell an unusable payload apart from a transport failure.
#[instrument(skip(client))]
pub async fn fetch_dataset_rows(
    client: &PlatformClient,
    slug: &str,
) -> Result<Option<Vec<DatasetRow>>, ClientError> {
    let body: Value = client.get_json(&rows_path(slug), &[]).await?;
    let rows = parse_rows(body)?;
    if let Some(ref rows) = rows {
        debug!("fetched {} rows for dataset '{}'", rows.len(), slug);
    }
    Ok(rows)
}

pub(crate) fn parse_rows(mut body: Value) -> Result<Option<Vec<DatasetRow>>, ClientError> {
    match body.get_mut("data").map(Value::take) {
        Some(data @ Value::Array(_)) => Ok(Some(serde_json::from_value(data)?)),
        _ => Ok(None),
    }
}
