//! Platform connection handle.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::ClientError;

/// Default timeout for platform requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_BASE_URL: &str = "EVAL_API_URL";
pub const ENV_API_KEY: &str = "EVAL_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "EVAL_API_TIMEOUT_SECS";

/// Connection settings for [`PlatformClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the platform, e.g. `https://eval.example.com`.
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("eval-nodes/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Read settings from `EVAL_API_URL`, `EVAL_API_KEY` and the optional
    /// `EVAL_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var(ENV_BASE_URL)
            .map_err(|_| ClientError::InvalidConfig(format!("{ENV_BASE_URL} is not set")))?;
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| ClientError::InvalidConfig(format!("{ENV_API_KEY} is not set")))?;

        let mut config = Self::new(base_url, api_key);
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.parse().map_err(|_| {
                ClientError::InvalidConfig(format!("{ENV_TIMEOUT_SECS} must be an integer, got '{raw}'"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ClientError::InvalidConfig("base url is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "base url must start with http:// or https://, got '{url}'"
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(ClientError::InvalidConfig("api key is empty".into()));
        }
        Ok(())
    }

    /// Timeout to apply, falling back to [`DEFAULT_TIMEOUT`] when zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

/// Authenticated handle shared by every request function in [`crate::api`].
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        info!("Creating platform client for {}", config.base_url);

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|e| ClientError::InvalidConfig(format!("api key is not a valid header value: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.effective_timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `GET` a path and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        debug!("GET {path}");
        let resp = self
            .http
            .request(Method::GET, self.url(path))
            .query(query)
            .send()
            .await?;
        decode(path, resp).await
    }

    /// `POST` a JSON body and decode the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        debug!("POST {path}");
        let resp = self
            .http
            .request(Method::POST, self.url(path))
            .json(body)
            .send()
            .await?;
        decode(path, resp).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            path: path.to_string(),
            body,
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
