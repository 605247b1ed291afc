//! Row-level comparison of two sheet snapshots.
//!
//! Rows are correlated by a composite key: the key cells joined with [`KEY_SEPARATOR`].
//! When a key repeats inside one snapshot only its first row takes part in the comparison.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::is_missing,
    error::{PromoError, Result},
    table::Table,
};

/// Joins key cells into a composite key. Cells containing `||` can collide.
pub const KEY_SEPARATOR: &str = "||";

/// How rows of the two snapshots are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    /// Composite key built from these columns, in order.
    Columns(Vec<String>),
    /// Row position. Any reordering shows up as edits, so this is opt-in only.
    Position,
}

impl RowKey {
    /// Keeps the candidate columns present in both snapshots.
    ///
    /// With none left, falls back to [`RowKey::Position`] when allowed and fails with
    /// [`PromoError::NoKeyColumns`] otherwise.
    pub fn resolve(
        old: &Table,
        new: &Table,
        candidates: &[String],
        position_fallback: bool,
    ) -> Result<Self> {
        let shared = candidates
            .iter()
            .filter(|column| old.has_column(column) && new.has_column(column))
            .cloned()
            .collect::<Vec<_>>();
        if !shared.is_empty() {
            Ok(RowKey::Columns(shared))
        } else if position_fallback {
            Ok(RowKey::Position)
        } else {
            Err(PromoError::NoKeyColumns)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowChange {
    pub row_key: Option<String>,
    pub data: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub column: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowModification {
    pub row_key: String,
    pub changes: Vec<CellChange>,
    /// Full row before the change, blank cells as `None`.
    pub old_data: Vec<(String, Option<String>)>,
    pub new_data: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_changes: usize,
    pub rows_added: usize,
    pub rows_deleted: usize,
    pub rows_modified: usize,
    pub cells_changed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff {
    pub added_rows: Vec<RowChange>,
    pub deleted_rows: Vec<RowChange>,
    pub modified_rows: Vec<RowModification>,
    pub summary: DiffSummary,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.summary.total_changes == 0
    }

    fn finish(mut self) -> Self {
        self.summary = DiffSummary {
            rows_added: self.added_rows.len(),
            rows_deleted: self.deleted_rows.len(),
            rows_modified: self.modified_rows.len(),
            cells_changed: self.modified_rows.iter().map(|row| row.changes.len()).sum(),
            total_changes: self.added_rows.len()
                + self.deleted_rows.len()
                + self.modified_rows.len(),
        };
        self
    }
}

/// Resolves the row key from `candidates` and diffs the snapshots.
///
/// When either side has no rows the key is not needed and never resolved, so an empty
/// snapshot diffs cleanly against one that shares none of the key columns.
pub fn diff_snapshots(
    old: &Table,
    new: &Table,
    candidates: &[String],
    position_fallback: bool,
) -> Result<TableDiff> {
    let key = if old.is_empty() || new.is_empty() {
        RowKey::Position
    } else {
        RowKey::resolve(old, new, candidates, position_fallback)?
    };
    debug!("Correlating rows by {key:?}");
    diff_tables(old, new, &key)
}

pub fn diff_tables(old: &Table, new: &Table, key: &RowKey) -> Result<TableDiff> {
    debug!(
        "Comparing snapshots: {} old row(s), {} new row(s)",
        old.len(),
        new.len()
    );
    if old.is_empty() && new.is_empty() {
        return Ok(TableDiff::default());
    }
    if old.is_empty() {
        return Ok(TableDiff {
            added_rows: unkeyed_rows(new),
            ..TableDiff::default()
        }
        .finish());
    }
    if new.is_empty() {
        return Ok(TableDiff {
            deleted_rows: unkeyed_rows(old),
            ..TableDiff::default()
        }
        .finish());
    }

    let old_keys = composite_keys(old, key)?;
    let new_keys = composite_keys(new, key)?;
    let old_index = first_rows(&old_keys);
    let new_index = first_rows(&new_keys);

    let mut diff = TableDiff::default();
    for (row_key, row) in unique_keys(&new_keys) {
        if !old_index.contains_key(row_key) {
            diff.added_rows.push(keyed_row(new, row, row_key));
        }
    }
    for (row_key, row) in unique_keys(&old_keys) {
        match new_index.get(row_key) {
            None => diff.deleted_rows.push(keyed_row(old, row, row_key)),
            Some(&new_row) => {
                let changes = cell_changes(old, row, new, new_row);
                if !changes.is_empty() {
                    diff.modified_rows.push(RowModification {
                        row_key: row_key.to_string(),
                        changes,
                        old_data: snapshot_row(old, row),
                        new_data: snapshot_row(new, new_row),
                    });
                }
            }
        }
    }
    Ok(diff.finish())
}

fn composite_keys(table: &Table, key: &RowKey) -> Result<Vec<String>> {
    match key {
        RowKey::Position => Ok((0..table.len()).map(|idx| idx.to_string()).collect()),
        RowKey::Columns(columns) if columns.is_empty() => Err(PromoError::NoKeyColumns),
        RowKey::Columns(columns) => {
            let indexes = columns
                .iter()
                .map(|column| table.require_column(column))
                .collect::<Result<Vec<_>>>()?;
            Ok(table
                .rows()
                .iter()
                .map(|row| indexes.iter().map(|&idx| row[idx].as_str()).join(KEY_SEPARATOR))
                .collect())
        }
    }
}

fn first_rows(keys: &[String]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(keys.len());
    for (row, key) in keys.iter().enumerate() {
        index.entry(key.as_str()).or_insert(row);
    }
    index
}

fn unique_keys(keys: &[String]) -> impl Iterator<Item = (&str, usize)> {
    keys.iter()
        .enumerate()
        .map(|(row, key)| (key.as_str(), row))
        .unique_by(|(key, _)| *key)
}

fn cell_changes(old: &Table, old_row: usize, new: &Table, new_row: usize) -> Vec<CellChange> {
    old.headers()
        .iter()
        .enumerate()
        .filter_map(|(idx, column)| {
            let old_value = present(&old.rows()[old_row][idx]);
            let new_value = new
                .column_index(column)
                .and_then(|new_idx| present(&new.rows()[new_row][new_idx]));
            (old_value != new_value).then(|| CellChange {
                column: column.clone(),
                old_value: old_value.map(str::to_string),
                new_value: new_value.map(str::to_string),
            })
        })
        .collect()
}

fn present(value: &str) -> Option<&str> {
    (!is_missing(value)).then_some(value)
}

fn record(table: &Table, row: usize) -> Vec<(String, String)> {
    table
        .headers()
        .iter()
        .cloned()
        .zip(table.rows()[row].iter().cloned())
        .collect()
}

fn snapshot_row(table: &Table, row: usize) -> Vec<(String, Option<String>)> {
    table
        .headers()
        .iter()
        .zip(&table.rows()[row])
        .map(|(column, value)| (column.clone(), present(value).map(str::to_string)))
        .collect()
}

fn keyed_row(table: &Table, row: usize, key: &str) -> RowChange {
    RowChange {
        row_key: Some(key.to_string()),
        data: record(table, row),
    }
}

fn unkeyed_rows(table: &Table) -> Vec<RowChange> {
    (0..table.len())
        .map(|row| RowChange {
            row_key: None,
            data: record(table, row),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_grid(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
        .expect("table")
    }

    fn keys(columns: &[&str]) -> RowKey {
        RowKey::Columns(columns.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn empty_key_list_is_rejected() {
        let t = table(&[&["a"], &["1"]]);
        assert_eq!(
            diff_tables(&t, &t, &RowKey::Columns(Vec::new())),
            Err(PromoError::NoKeyColumns)
        );
    }

    #[test]
    fn resolve_keeps_shared_columns_in_candidate_order() {
        let old = table(&[&["b", "a", "c"]]);
        let new = table(&[&["a", "b"]]);
        let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            RowKey::resolve(&old, &new, &candidates, false),
            Ok(keys(&["a", "b"]))
        );
        let none = vec!["z".to_string()];
        assert_eq!(
            RowKey::resolve(&old, &new, &none, false),
            Err(PromoError::NoKeyColumns)
        );
        assert_eq!(
            RowKey::resolve(&old, &new, &none, true),
            Ok(RowKey::Position)
        );
    }

    #[test]
    fn one_sided_tables_short_circuit() {
        let empty = table(&[&["k", "v"]]);
        let full = table(&[&["k", "v"], &["1", "x"], &["2", "y"]]);
        let added = diff_tables(&empty, &full, &RowKey::Columns(Vec::new())).expect("diff");
        assert_eq!(added.summary.rows_added, 2);
        assert_eq!(added.added_rows[0].row_key, None);
        let deleted = diff_tables(&full, &empty, &keys(&["k"])).expect("diff");
        assert_eq!(deleted.summary.rows_deleted, 2);
        assert_eq!(deleted.summary.total_changes, 2);
        assert!(diff_tables(&empty, &empty, &keys(&["k"])).expect("diff").is_empty());
    }

    #[test]
    fn missing_and_empty_cells_are_equal() {
        let old = table(&[&["k", "v", "gone"], &["1", "", "x"]]);
        let new = table(&[&["k", "v"], &["1"]]);
        let diff = diff_tables(&old, &new, &keys(&["k"])).expect("diff");
        assert_eq!(diff.summary.rows_modified, 1);
        assert_eq!(
            diff.modified_rows[0].changes,
            vec![CellChange {
                column: "gone".into(),
                old_value: Some("x".into()),
                new_value: None,
            }]
        );
    }

    #[test]
    fn duplicate_keys_use_first_row() {
        let old = table(&[&["k", "v"], &["1", "a"], &["1", "b"]]);
        let new = table(&[&["k", "v"], &["1", "a"]]);
        let diff = diff_tables(&old, &new, &keys(&["k"])).expect("diff");
        assert!(diff.is_empty());
    }

    #[test]
    fn position_key_reports_reorders_as_edits() {
        let old = table(&[&["v"], &["a"], &["b"]]);
        let new = table(&[&["v"], &["b"], &["a"]]);
        let diff = diff_tables(&old, &new, &RowKey::Position).expect("diff");
        assert_eq!(diff.summary.rows_modified, 2);
        assert_eq!(diff.modified_rows[0].row_key, "0");
    }

    #[test]
    fn composite_key_uses_separator() {
        let old = table(&[&["g", "p", "v"], &["Book", "Play", "1"]]);
        let new = table(&[&["g", "p", "v"], &["Book", "Play", "2"], &["Sun", "Hot", "3"]]);
        let diff = diff_tables(&old, &new, &keys(&["g", "p"])).expect("diff");
        assert_eq!(diff.modified_rows[0].row_key, "Book||Play");
        assert_eq!(diff.added_rows[0].row_key.as_deref(), Some("Sun||Hot"));
        assert_eq!(diff.summary.cells_changed, 1);
        assert_eq!(diff.summary.total_changes, 2);
    }
}
