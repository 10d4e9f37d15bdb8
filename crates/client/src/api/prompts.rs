//! Prompt management.

use tracing::instrument;

use crate::{
    models::{Prompt, PromptSelector},
    ClientError, PlatformClient,
};

pub(crate) fn prompt_path(slug: &str) -> String {
    format!("/api/v1/prompts/{slug}")
}

pub(crate) fn selector_query(selector: &PromptSelector) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(version) = selector.version {
        query.push(("version", version.to_string()));
    }
    if let Some(label) = &selector.label {
        query.push(("label", label.clone()));
    }
    query
}

/// Resolve a prompt by slug and optional version/label.
///
/// Returns `ClientError::NotFound` when no such prompt (or version) exists.
#[instrument(skip(client))]
pub async fn get_prompt(
    client: &PlatformClient,
    slug: &str,
    selector: &PromptSelector,
) -> Result<Prompt, ClientError> {
    client
        .get_json(&prompt_path(slug), &selector_query(selector))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_maps_to_query_pairs() {
        assert!(selector_query(&PromptSelector::default()).is_empty());
        assert_eq!(
            selector_query(&PromptSelector { version: Some(4), label: None }),
            vec![("version", "4".to_string())]
        );
        assert_eq!(
            selector_query(&PromptSelector { version: None, label: Some("staging".into()) }),
            vec![("label", "staging".to_string())]
        );
    }
}
