//! Engine-level error types.

use client::ClientError;
use thiserror::Error;

/// Errors produced by the dataset cursor (reload + emission).
#[derive(Debug, Error)]
pub enum CursorError {
    // ------ Reload errors ------

    /// The fetch succeeded but yielded no usable rows.
    #[error("dataset '{collection_id}' returned no rows; check that it exists and is not empty")]
    CollectionEmpty { collection_id: String },

    /// The platform could not be reached, rejected the request, or sent an
    /// unreadable body.
    #[error(
        "failed to fetch dataset '{collection_id}': {source}; check the API credentials and platform connectivity"
    )]
    TransportFailure {
        collection_id: String,
        #[source]
        source: ClientError,
    },

    // ------ Emission errors ------

    /// Every row of the current window has been emitted.
    #[error(
        "all {total} rows have been emitted (cursor at {cursor}); reset progress or change the row window to start over"
    )]
    RowsExhausted { cursor: usize, total: usize },

    // ------ Setup errors ------

    #[error("invalid cursor configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a [`crate::ScopeStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scope store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode scope record: {0}")]
    Encode(#[from] serde_json::Error),
}
