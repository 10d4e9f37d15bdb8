//! Dataset cursor: fetch-once, shuffle, window, emit.
//!
//! `DatasetCursor` owns one node instance's view of a remote collection:
//! 1. Decides whether the cached snapshot is still valid (reload key).
//! 2. On reload, fetches the whole collection and shuffles it once.
//! 3. Applies the window and row limit to produce the working set.
//! 4. Emits the row under the cursor, or fails with `RowsExhausted`.
//!
//! All state lives in the injected [`ScopeStore`]; nothing is committed when
//! a fetch fails.

use client::models::DatasetRow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::models::{CursorConfig, EmittedRow, ReloadKey};
use crate::{shuffle, window, CollectionSource, CursorError, ScopeStore};

/// How the cursor position survives between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Position supplied by the caller from its own previous output
    /// (see [`EmittedRow::next_cursor`]); never persisted.
    Stepwise { previous_cursor: Option<usize> },
    /// Position persisted in the scope store after every emission.
    Resumable,
}

/// Record persisted in the scope store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    pub reload_key: ReloadKey,
    pub snapshot: Vec<DatasetRow>,
    /// Next working-set index (resumable lifecycle only).
    #[serde(default)]
    pub cursor: usize,
}

/// Scope key under which a node instance's cursor state is stored.
pub fn scope_key(node_id: &str) -> String {
    format!("dataset-cursor:{node_id}")
}

/// True when the snapshot recorded under `recorded` cannot serve `current`.
pub fn needs_reload(recorded: Option<&ReloadKey>, current: &ReloadKey) -> bool {
    match recorded {
        None => true,
        Some(_) if current.reset => true,
        Some(recorded) => recorded != current,
    }
}

pub struct DatasetCursor<'a, S: ?Sized> {
    source: &'a S,
    store: &'a dyn ScopeStore,
    scope: String,
}

impl<'a, S: CollectionSource + ?Sized> DatasetCursor<'a, S> {
    pub fn new(source: &'a S, store: &'a dyn ScopeStore, scope: impl Into<String>) -> Self {
        Self {
            source,
            store,
            scope: scope.into(),
        }
    }

    /// Emit the next row of the configured window.
    ///
    /// # Errors
    /// - [`CursorError::InvalidConfig`] if `config` fails validation.
    /// - [`CursorError::TransportFailure`] / [`CursorError::CollectionEmpty`]
    ///   if a reload was needed and the fetch failed.
    /// - [`CursorError::RowsExhausted`] once the cursor reaches the effective total.
    #[instrument(skip(self, config), fields(scope = %self.scope, collection = %config.collection_id))]
    pub async fn next_row(
        &self,
        config: &CursorConfig,
        mode: CursorMode,
    ) -> Result<EmittedRow, CursorError> {
        config.validate()?;
        let key = config.reload_key();

        let (mut state, reloaded) = match self.load_state()? {
            Some(state) if !needs_reload(Some(&state.reload_key), &key) => {
                debug!("reusing cached snapshot of {} rows", state.snapshot.len());
                (state, false)
            }
            previous => {
                if previous.is_some() {
                    info!("reload key changed or reset requested, refetching");
                }
                let state = self.reload(config, key).await?;
                self.save_state(&state)?;
                (state, true)
            }
        };

        let cursor = match mode {
            _ if reloaded => 0,
            CursorMode::Resumable => state.cursor,
            CursorMode::Stepwise { previous_cursor } => previous_cursor.unwrap_or(0),
        };

        let working = window::apply_limit(
            window::working_set(&state.snapshot, &config.window()),
            config.row_limit(),
        );
        let total = working.len();

        if cursor >= total {
            warn!("cursor {} reached effective total {}", cursor, total);
            return Err(CursorError::RowsExhausted { cursor, total });
        }

        let row = EmittedRow::new(working[cursor], cursor, total);
        debug!(
            "emitting row {} ({}/{}), {} left",
            row.row_id, row.progress.current, total, row.rows_left
        );

        if mode == CursorMode::Resumable {
            state.cursor = cursor + 1;
            self.save_state(&state)?;
        }

        Ok(row)
    }

    /// Drop the persisted cursor position without touching the snapshot.
    pub fn rewind(&self) -> Result<(), CursorError> {
        if let Some(mut state) = self.load_state()? {
            state.cursor = 0;
            self.save_state(&state)?;
        }
        Ok(())
    }

    /// Persisted state, if any. Records that no longer decode are treated as
    /// absent so the next call reloads.
    pub fn load_state(&self) -> Result<Option<CursorState>, CursorError> {
        let Some(record) = self.store.load(&self.scope)? else {
            return Ok(None);
        };
        match serde_json::from_value(record) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("discarding unreadable cursor state for '{}': {}", self.scope, e);
                Ok(None)
            }
        }
    }

    fn save_state(&self, state: &CursorState) -> Result<(), CursorError> {
        let record = serde_json::to_value(state).map_err(crate::StoreError::from)?;
        self.store.save(&self.scope, record)?;
        Ok(())
    }

    async fn reload(&self, config: &CursorConfig, key: ReloadKey) -> Result<CursorState, CursorError> {
        let collection_id = config.collection_id.clone();
        let fetched = self
            .source
            .fetch_collection(&collection_id)
            .await
            .map_err(|source| CursorError::TransportFailure {
                collection_id: collection_id.clone(),
                source,
            })?;

        let mut snapshot = match fetched {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Err(CursorError::CollectionEmpty { collection_id }),
        };

        if config.shuffle_rows {
            shuffle::shuffle(&mut snapshot, config.shuffle_seed);
        }

        info!(
            "loaded {} rows from '{}' (shuffled: {}, seed: {})",
            snapshot.len(),
            collection_id,
            config.shuffle_rows,
            config.shuffle_seed
        );

        Ok(CursorState {
            reload_key: key,
            snapshot,
            cursor: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: i64, reset: bool) -> ReloadKey {
        ReloadKey {
            collection_id: "ds1".into(),
            shuffle_rows: true,
            shuffle_seed: seed,
            reset,
        }
    }

    #[test]
    fn first_call_always_reloads() {
        assert!(needs_reload(None, &key(1, false)));
    }

    #[test]
    fn identical_key_reuses_snapshot() {
        assert!(!needs_reload(Some(&key(1, false)), &key(1, false)));
    }

    #[test]
    fn changed_key_reloads() {
        assert!(needs_reload(Some(&key(1, false)), &key(2, false)));
    }

    #[test]
    fn reset_always_reloads() {
        assert!(needs_reload(Some(&key(1, true)), &key(1, true)));
    }

    #[test]
    fn scope_key_is_namespaced() {
        assert_eq!(scope_key("node-7"), "dataset-cursor:node-7");
    }
}
