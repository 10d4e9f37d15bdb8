//! Window and limit application.
//!
//! Applied to the cached snapshot on every invocation; window parameters can
//! change between calls without invalidating the snapshot.

use crate::models::{EndRow, WindowSpec};

/// Rows selected by `window`, in snapshot order.
pub fn working_set<'a, T>(snapshot: &'a [T], window: &WindowSpec) -> Vec<&'a T> {
    let len = snapshot.len();
    let start = usize::try_from(window.start_row.max(0)).unwrap_or(usize::MAX);
    let end = match window.end_row {
        EndRow::All => len,
        EndRow::Index(end) => end.saturating_add(1).min(len),
    };
    if start >= end {
        return Vec::new();
    }

    let step = usize::try_from(window.step_size.max(1)).unwrap_or(1);
    snapshot[start..end].iter().step_by(step).collect()
}

/// Truncate the working set to `limit` rows, if one is set.
pub fn apply_limit<T>(mut working: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(max) = limit {
        working.truncate(max);
    }
    working
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: [&str; 10] = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9"];

    fn window(start_row: i64, end_row: EndRow, step_size: i64) -> WindowSpec {
        WindowSpec { start_row, end_row, step_size }
    }

    fn select(spec: WindowSpec) -> Vec<&'static str> {
        working_set(&ROWS, &spec).into_iter().copied().collect()
    }

    #[test]
    fn default_window_is_everything() {
        assert_eq!(select(WindowSpec::default()), ROWS.to_vec());
    }

    #[test]
    fn start_end_step_selects_every_other_row() {
        assert_eq!(select(window(2, EndRow::Index(7), 2)), vec!["r2", "r4", "r6"]);
    }

    #[test]
    fn end_is_inclusive_and_clamped() {
        assert_eq!(select(window(8, EndRow::Index(9), 1)), vec!["r8", "r9"]);
        assert_eq!(select(window(8, EndRow::Index(500), 1)), vec!["r8", "r9"]);
    }

    #[test]
    fn negative_start_and_zero_step_are_normalised() {
        assert_eq!(select(window(-5, EndRow::Index(2), 0)), vec!["r0", "r1", "r2"]);
    }

    #[test]
    fn start_past_end_is_empty() {
        assert!(select(window(6, EndRow::Index(3), 1)).is_empty());
        assert!(select(window(10, EndRow::All, 1)).is_empty());
    }

    #[test]
    fn step_counts_from_window_start() {
        assert_eq!(select(window(1, EndRow::All, 3)), vec!["r1", "r4", "r7"]);
    }

    #[test]
    fn limit_truncates_working_set() {
        let working = working_set(&ROWS, &WindowSpec::default());
        assert_eq!(apply_limit(working.clone(), Some(3)).len(), 3);
        assert_eq!(apply_limit(working.clone(), Some(50)).len(), 10);
        assert_eq!(apply_limit(working, None).len(), 10);
    }
}
