//! Cursor configuration, cache keys, and the emitted row record.
//!
//! [`CursorConfig`] is deserialized straight from a node's parameter object
//! (camelCase keys, defaults for everything but the collection id).

use chrono::{DateTime, Utc};
use client::models::DatasetRow;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::CursorError;

// ---------------------------------------------------------------------------
// EndRow
// ---------------------------------------------------------------------------

/// Inclusive upper bound of the row window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndRow {
    /// Up to the end of the snapshot (`"all"`).
    #[default]
    All,
    Index(usize),
}

impl Serialize for EndRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

impl<'de> Deserialize<'de> for EndRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(i64),
            Float(f64),
            Text(String),
            Missing(()),
        }

        let index = |i: i64| -> Result<Self, D::Error> {
            usize::try_from(i).map(Self::Index).map_err(|_| {
                serde::de::Error::custom(format!("endRow must be >= 0 or \"all\", got {i}"))
            })
        };

        match Raw::deserialize(deserializer)? {
            Raw::Index(i) => index(i),
            Raw::Float(f) => index(integral(f).map_err(serde::de::Error::custom)?),
            Raw::Text(s) if s.eq_ignore_ascii_case("all") || s.is_empty() => Ok(Self::All),
            Raw::Text(s) => s.trim().parse::<usize>().map(Self::Index).map_err(|_| {
                serde::de::Error::custom(format!("endRow must be an index or \"all\", got '{s}'"))
            }),
            Raw::Missing(()) => Ok(Self::All),
        }
    }
}

/// Integer value of `f` if it has no fractional part.
fn integral(f: f64) -> Result<i64, String> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(format!("expected an integer, got {f}"))
    }
}

/// Deserialize an `i64` parameter, accepting floats such as `7.0`.
fn integer_param<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(i) => Ok(i),
        Raw::Float(f) => integral(f).map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// WindowSpec
// ---------------------------------------------------------------------------

/// Which rows of a snapshot form the working set.
///
/// `start_row` below 0 is clamped to 0 and `step_size` below 1 is treated
/// as 1 when the window is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub start_row: i64,
    pub end_row: EndRow,
    pub step_size: i64,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            start_row: 0,
            end_row: EndRow::All,
            step_size: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// ReloadKey
// ---------------------------------------------------------------------------

/// Cache key of a snapshot. A cached snapshot is only reused while the key
/// recorded at fetch time equals the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadKey {
    pub collection_id: String,
    pub shuffle_rows: bool,
    pub shuffle_seed: i64,
    pub reset: bool,
}

// ---------------------------------------------------------------------------
// CursorConfig
// ---------------------------------------------------------------------------

fn default_end_row() -> EndRow {
    EndRow::All
}

fn default_step_size() -> i64 {
    1
}

fn default_max_rows() -> usize {
    10
}

/// Validated per-call configuration of the dataset cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorConfig {
    #[serde(alias = "datasetSlug", alias = "datasetId")]
    pub collection_id: String,
    #[serde(default, deserialize_with = "integer_param")]
    pub start_row: i64,
    #[serde(default = "default_end_row")]
    pub end_row: EndRow,
    #[serde(default = "default_step_size", deserialize_with = "integer_param")]
    pub step_size: i64,
    #[serde(default)]
    pub limit_rows: bool,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default)]
    pub shuffle_rows: bool,
    /// 0 means a non-deterministic shuffle.
    #[serde(default)]
    pub shuffle_seed: i64,
    /// Only honoured by the resumable lifecycle.
    #[serde(default)]
    pub reset_progress: bool,
}

impl CursorConfig {
    /// Defaults for everything except the collection.
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            start_row: 0,
            end_row: EndRow::All,
            step_size: 1,
            limit_rows: false,
            max_rows: default_max_rows(),
            shuffle_rows: false,
            shuffle_seed: 0,
            reset_progress: false,
        }
    }

    /// Parse and validate a node parameter object.
    pub fn from_params(params: &Value) -> Result<Self, CursorError> {
        let config: Self = serde_json::from_value(params.clone())
            .map_err(|e| CursorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CursorError> {
        if self.collection_id.trim().is_empty() {
            return Err(CursorError::InvalidConfig("collectionId is required".into()));
        }
        if self.limit_rows && self.max_rows == 0 {
            return Err(CursorError::InvalidConfig(
                "maxRows must be at least 1 when limitRows is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> WindowSpec {
        WindowSpec {
            start_row: self.start_row,
            end_row: self.end_row,
            step_size: self.step_size,
        }
    }

    /// Row cap, if limiting is enabled.
    pub fn row_limit(&self) -> Option<usize> {
        self.limit_rows.then_some(self.max_rows)
    }

    pub fn reload_key(&self) -> ReloadKey {
        ReloadKey {
            collection_id: self.collection_id.clone(),
            shuffle_rows: self.shuffle_rows,
            shuffle_seed: self.shuffle_seed,
            reset: self.reset_progress,
        }
    }
}

// ---------------------------------------------------------------------------
// EmittedRow
// ---------------------------------------------------------------------------

/// Progress block attached to every emitted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percentage: usize,
    pub remaining: usize,
}

impl Progress {
    /// Progress after emitting working-set position `cursor` out of `total`.
    pub fn at(cursor: usize, total: usize) -> Self {
        let current = cursor + 1;
        let remaining = total.saturating_sub(current);
        // round(100 * current / total), halves rounded up
        let percentage = if total == 0 {
            0
        } else {
            (200 * current + total) / (2 * total)
        };
        Self {
            current,
            total,
            percentage,
            remaining,
        }
    }
}

/// The per-invocation output of a dataset trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedRow {
    pub row_number: usize,
    #[serde(rename = "_rowsLeft")]
    pub rows_left: usize,
    #[serde(rename = "_progress")]
    pub progress: Progress,
    pub entry: Value,
    #[serde(rename = "datasetId")]
    pub dataset_id: String,
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    pub row_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EmittedRow {
    pub fn new(row: &DatasetRow, cursor: usize, total: usize) -> Self {
        let progress = Progress::at(cursor, total);
        Self {
            row_number: cursor,
            rows_left: progress.remaining,
            progress,
            entry: row.entry.clone(),
            dataset_id: row.dataset_id.clone(),
            project_id: row.project_id.clone(),
            row_id: row.id.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Cursor the stepwise lifecycle should resume from after this row, or
    /// `None` once the window has been fully emitted.
    pub fn next_cursor(&self) -> Option<usize> {
        (self.rows_left != 0).then_some(self.row_number + 1)
    }
}
