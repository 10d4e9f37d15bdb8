//! Node-level error type.

use client::ClientError;
use engine::CursorError;
use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// The host uses the variant to decide retry behaviour:
/// - `Retryable`: a transient platform failure; the job may be re-queued.
/// - `Fatal`: configuration, data, or exhaustion errors; do not retry.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the host may re-try the job.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

impl NodeError {
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl From<ClientError> for NodeError {
    fn from(err: ClientError) -> Self {
        if err.is_transient() {
            Self::Retryable(err.to_string())
        } else {
            Self::Fatal(err.to_string())
        }
    }
}

impl From<CursorError> for NodeError {
    fn from(err: CursorError) -> Self {
        match &err {
            CursorError::TransportFailure { source, .. } if source.is_transient() => {
                Self::Retryable(err.to_string())
            }
            _ => Self::Fatal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Fatal(format!("serialization error: {err}"))
    }
}
