//! `PromptNode`: resolves a managed prompt and renders it with variables.
//!
//! Fetched prompts are cached in the scope store, keyed by node, slug and
//! version selector, so a workflow looping over a dataset does not refetch
//! the same prompt for every row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use client::models::{Prompt, PromptSelector, PromptTemplate};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::items::first_item;
use crate::traits::ExecutionContext;
use crate::{EvalPlatform, ExecutableNode, NodeError};

fn default_compile() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    60
}

/// Parameters of a prompt node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParams {
    #[serde(alias = "promptName")]
    pub prompt_slug: String,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub label: Option<String>,
    /// Render the template; otherwise the raw template is returned as `prompt`.
    #[serde(default = "default_compile")]
    pub compile: bool,
    #[serde(default)]
    pub variables: Map<String, Value>,
    /// 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl PromptParams {
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.prompt_slug.trim().is_empty() {
            return Err(NodeError::fatal("promptSlug is required"));
        }
        if self.version.is_some() && self.label.as_deref().is_some_and(|l| !l.is_empty()) {
            return Err(NodeError::fatal("set either version or label, not both"));
        }
        Ok(())
    }

    pub fn selector(&self) -> PromptSelector {
        PromptSelector {
            version: self.version,
            label: self.label.clone().filter(|l| !l.trim().is_empty()),
        }
    }
}

/// Cache record kept in the scope store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedPrompt {
    prompt: Prompt,
    fetched_at: DateTime<Utc>,
}

pub fn cache_key(node_id: &str, slug: &str, selector: &PromptSelector) -> String {
    format!("prompt:{node_id}:{slug}:{selector}")
}

/// Render `source` with `variables`. Unknown variables render empty.
pub fn render(source: &str, variables: &Map<String, Value>) -> Result<String, NodeError> {
    Environment::new()
        .render_str(source, variables)
        .map_err(|e| NodeError::fatal(format!("prompt template error: {e}")))
}

/// Compiled form of `template`: a string for text prompts, a message list for chat.
pub fn compile(template: &PromptTemplate, variables: &Map<String, Value>) -> Result<Value, NodeError> {
    match template {
        PromptTemplate::Text(text) => Ok(Value::String(render(text, variables)?)),
        PromptTemplate::Chat(messages) => messages
            .iter()
            .map(|m| Ok(json!({ "role": m.role, "content": render(&m.content, variables)? })))
            .collect::<Result<Vec<_>, NodeError>>()
            .map(Value::Array),
    }
}

pub struct PromptNode<P: ?Sized> {
    platform: Arc<P>,
    params: PromptParams,
}

impl<P: EvalPlatform + ?Sized> PromptNode<P> {
    pub fn new(platform: Arc<P>, params: PromptParams) -> Result<Self, NodeError> {
        params.validate()?;
        Ok(Self { platform, params })
    }

    pub fn from_params(platform: Arc<P>, params: &Value) -> Result<Self, NodeError> {
        let params: PromptParams = serde_json::from_value(params.clone())
            .map_err(|e| NodeError::fatal(format!("invalid prompt parameters: {e}")))?;
        Self::new(platform, params)
    }

    /// The prompt, from the cache when fresh. Returns whether it was cached.
    async fn resolve(&self, ctx: &ExecutionContext) -> Result<(Prompt, bool), NodeError> {
        let selector = self.params.selector();
        let slug = self.params.prompt_slug.trim();
        let key = cache_key(&ctx.node_id, slug, &selector);
        let ttl = self.params.cache_ttl_seconds;

        if ttl > 0 {
            if let Some(cached) = self.cached(ctx, &key)? {
                let age = Utc::now() - cached.fetched_at;
                // TTLs beyond the representable range never expire.
                let fresh = i64::try_from(ttl)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .map_or(true, |ttl| age < ttl);
                if fresh {
                    debug!("prompt '{}' ({}) served from cache", slug, selector);
                    return Ok((cached.prompt, true));
                }
            }
        }

        let prompt = self.platform.get_prompt(slug, &selector).await?;
        debug!("fetched prompt '{}' version {}", prompt.slug, prompt.version);

        if ttl > 0 {
            let record = CachedPrompt {
                prompt: prompt.clone(),
                fetched_at: Utc::now(),
            };
            ctx.store
                .save(&key, serde_json::to_value(record)?)
                .map_err(|e| NodeError::fatal(e.to_string()))?;
        }
        Ok((prompt, false))
    }

    fn cached(&self, ctx: &ExecutionContext, key: &str) -> Result<Option<CachedPrompt>, NodeError> {
        let record = ctx
            .store
            .load(key)
            .map_err(|e| NodeError::fatal(e.to_string()))?;
        Ok(record.and_then(|r| match serde_json::from_value(r) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!("ignoring unreadable prompt cache entry '{}': {}", key, e);
                None
            }
        }))
    }

    fn variables(&self, input: &Value) -> Map<String, Value> {
        let mut variables = self.params.variables.clone();
        if let Some(Value::Object(overrides)) = first_item(input).and_then(|item| item.get("variables")) {
            variables.extend(overrides.clone());
        }
        variables
    }
}

#[async_trait]
impl<P: EvalPlatform + ?Sized + 'static> ExecutableNode for PromptNode<P> {
    #[instrument(skip(self, input, ctx), fields(node_id = %ctx.node_id, slug = %self.params.prompt_slug))]
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let (prompt, cached) = self.resolve(ctx).await?;

        let template = serde_json::to_value(&prompt.template)?;
        let compiled = if self.params.compile {
            compile(&prompt.template, &self.variables(&input))?
        } else {
            template.clone()
        };

        Ok(json!({
            "slug": prompt.slug,
            "version": prompt.version,
            "type": prompt.kind.to_string(),
            "prompt": compiled,
            "template": template,
            "config": prompt.config,
            "labels": prompt.labels,
            "cached": cached,
        }))
    }
}
