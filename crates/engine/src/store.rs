//! Host-managed persistent scope.
//!
//! Invocations of one node instance share no process memory; everything that
//! must survive between them goes through a [`ScopeStore`], keyed by
//! node-instance identity. The host is expected to drive at most one
//! invocation per scope at a time.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::StoreError;

/// Synchronous key/value access to opaque per-scope records.
pub trait ScopeStore: Send + Sync + std::fmt::Debug {
    /// Current record for `scope`, if any.
    fn load(&self, scope: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the record for `scope`.
    fn save(&self, scope: &str, record: Value) -> Result<(), StoreError>;
}

/// Process-local store for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScopeStore for MemoryStore {
    fn load(&self, scope: &str) -> Result<Option<Value>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(records.get(scope).cloned())
    }

    fn save(&self, scope: &str, record: Value) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        records.insert(scope.to_owned(), record);
        Ok(())
    }
}
