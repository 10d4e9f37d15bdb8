//! JSON-file scope store, so repeated CLI runs behave like repeated
//! executions in a host.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use engine::{ScopeStore, StoreError};
use serde_json::Value;

/// Every scope is a top-level key of one JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Sibling file the next state is written to before it replaces `path`.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(unavailable(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {err}", path.display()))
}

impl ScopeStore for FileStore {
    fn load(&self, scope: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Unavailable("file store lock poisoned".into()))?;
        Ok(self.read_all()?.remove(scope))
    }

    fn save(&self, scope: &str, record: Value) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Unavailable("file store lock poisoned".into()))?;
        let mut records = self.read_all()?;
        records.insert(scope.to_owned(), record);

        let body = serde_json::to_string_pretty(&records)?;
        let staging = self.staging_path();
        std::fs::write(&staging, body).map_err(|e| unavailable(&staging, e))?;
        std::fs::rename(&staging, &self.path).map_err(|e| unavailable(&self.path, e))
    }
}
