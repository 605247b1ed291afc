//! Coarse change detection.
//!
//! A snapshot is reduced to a SHA-256 digest of its canonical CSV form: the header line
//! followed by every row in order, missing cells written as empty fields. The digest is
//! sensitive to row order as well as to values, so a re-sorted sheet counts as changed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCheck {
    pub hash: String,
    pub changed: bool,
}

pub fn content_hash(table: &Table) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(Vec::new());
    writer
        .write_record(table.headers())
        .context("Serializing header for hashing")?;
    for row in table.rows() {
        writer
            .write_record(row)
            .context("Serializing row for hashing")?;
    }
    let canonical = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Flushing canonical CSV: {}", err.error()))?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}

/// Compares the current snapshot against the last known digest.
pub fn detect_change(current: &Table, previous_hash: Option<&str>) -> Result<ChangeCheck> {
    let hash = content_hash(current)?;
    let changed = previous_hash != Some(hash.as_str());
    Ok(ChangeCheck { hash, changed })
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

    #[test]
    fn first_check_is_a_change() {
        let current = table(&[&["a", "b"], &["1", "2"]]);
        let check = detect_change(&current, None).expect("check");
        assert!(check.changed);
        assert_eq!(check.hash.len(), 64);
    }

    #[test]
    fn same_content_same_hash() {
        let current = table(&[&["a", "b"], &["1", "2"]]);
        let first = detect_change(&current, None).expect("check");
        let second = detect_change(&current, Some(&first.hash)).expect("check");
        assert_eq!(first.hash, second.hash);
        assert!(!second.changed);
    }

    #[test]
    fn padded_and_explicit_empty_cells_hash_alike() {
        let padded = table(&[&["a", "b"], &["1"]]);
        let explicit = table(&[&["a", "b"], &["1", ""]]);
        assert_eq!(
            content_hash(&padded).expect("hash"),
            content_hash(&explicit).expect("hash")
        );
    }

    #[test]
    fn row_order_changes_hash() {
        let forward = table(&[&["a"], &["1"], &["2"]]);
        let reversed = table(&[&["a"], &["2"], &["1"]]);
        assert_ne!(
            content_hash(&forward).expect("hash"),
            content_hash(&reversed).expect("hash")
        );
    }
}
