//! `engine` crate: the dataset cursor with snapshot caching, shuffling,
//! windowing, and resumable row emission over an injected scope store.

pub mod cursor;
pub mod error;
pub mod mock;
pub mod models;
pub mod shuffle;
pub mod source;
pub mod store;
pub mod window;

pub use cursor::{CursorMode, CursorState, DatasetCursor};
pub use error::{CursorError, StoreError};
pub use models::{CursorConfig, EmittedRow, EndRow, Progress, ReloadKey, WindowSpec};
pub use source::CollectionSource;
pub use store::{MemoryStore, ScopeStore};
