//! Persisted change history.
//!
//! Two JSON documents live next to the dashboard: the coarse log, which remembers the last
//! content hash, and the detailed log, which keeps the previous snapshot so the next run
//! can diff against it. Both keep only their newest entries.
//!
//! Every save writes a temporary file in the target directory and renames it over the
//! document, so readers never see a half-written file. Updates are read-compare-write
//! without a lock: two processes tracking the same file at once can drop one another's
//! entry.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use log::{info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;

use crate::{
    diff::{TableDiff, diff_snapshots},
    table::Table,
    tracker::detect_change,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub timestamp: DateTime<Local>,
    pub has_changes: bool,
    pub current_hash: String,
    pub previous_hash: Option<String>,
    pub rows_count: usize,
    pub columns_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    #[serde(default)]
    pub last_hash: Option<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Local>>,
    #[serde(default)]
    pub changes: Vec<ChangeEvent>,
}

impl ChangeLog {
    /// Compares `current` with the last known hash and records a change event if needed.
    pub fn observe(
        &mut self,
        current: &Table,
        now: DateTime<Local>,
        retention: usize,
    ) -> Result<ChangeEvent> {
        let check = detect_change(current, self.last_hash.as_deref())?;
        let event = ChangeEvent {
            timestamp: now,
            has_changes: check.changed,
            current_hash: check.hash,
            previous_hash: self.last_hash.clone(),
            rows_count: current.len(),
            columns_count: current.column_count(),
        };
        if event.has_changes {
            self.changes.push(event.clone());
            self.last_hash = Some(event.current_hash.clone());
            self.last_update = Some(now);
            truncate_oldest(&mut self.changes, retention);
        }
        Ok(event)
    }

    pub fn summary(&self, now: DateTime<Local>) -> ChangesSummary {
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
            .unwrap_or(now);
        let week_start = today_start - Duration::days(7);
        ChangesSummary {
            total_changes: self.changes.len(),
            last_change: self.changes.last().map(|event| event.timestamp),
            changes_today: self
                .changes
                .iter()
                .filter(|event| event.timestamp >= today_start)
                .count(),
            changes_this_week: self
                .changes
                .iter()
                .filter(|event| event.timestamp >= week_start)
                .count(),
            last_hash: self.last_hash.clone(),
            last_update: self.last_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesSummary {
    pub total_changes: usize,
    pub last_change: Option<DateTime<Local>>,
    pub changes_today: usize,
    pub changes_this_week: usize,
    pub last_hash: Option<String>,
    pub last_update: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedEvent {
    pub timestamp: DateTime<Local>,
    pub is_first_run: bool,
    pub has_changes: bool,
    pub rows_count: usize,
    pub columns_count: usize,
    pub detailed_changes: Option<TableDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedLog {
    #[serde(default)]
    pub changes: Vec<DetailedEvent>,
    #[serde(default)]
    pub last_data: Option<Table>,
}

impl DetailedLog {
    /// Diffs `current` against the stored snapshot and remembers `current` for next time.
    ///
    /// Returns the event and whether the log needs saving: the first run and every run
    /// with changes are recorded, unchanged runs are not.
    pub fn observe(
        &mut self,
        current: &Table,
        key_candidates: &[String],
        position_fallback: bool,
        now: DateTime<Local>,
        retention: usize,
    ) -> Result<(DetailedEvent, bool)> {
        let event = match &self.last_data {
            None => DetailedEvent {
                timestamp: now,
                is_first_run: true,
                has_changes: false,
                rows_count: current.len(),
                columns_count: current.column_count(),
                detailed_changes: None,
            },
            Some(previous) => {
                let diff =
                    diff_snapshots(previous, current, key_candidates, position_fallback)?;
                DetailedEvent {
                    timestamp: now,
                    is_first_run: false,
                    has_changes: !diff.is_empty(),
                    rows_count: current.len(),
                    columns_count: current.column_count(),
                    detailed_changes: Some(diff),
                }
            }
        };
        self.last_data = Some(current.clone());
        let record = event.has_changes || event.is_first_run;
        if record {
            self.changes.push(event.clone());
            truncate_oldest(&mut self.changes, retention);
        }
        Ok((event, record))
    }

    /// Newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> &[DetailedEvent] {
        let skip = self.changes.len().saturating_sub(limit);
        &self.changes[skip..]
    }
}

/// Coarse tracking round-trip: load the log, observe, save when something changed.
pub fn track_changes(
    current: &Table,
    path: &Path,
    now: DateTime<Local>,
    retention: usize,
) -> Result<ChangeEvent> {
    let mut log: ChangeLog = load_or_default(path);
    let event = log.observe(current, now, retention)?;
    if event.has_changes {
        save_document(path, &log)?;
        info!("Change recorded in {path:?} ({} entries kept)", log.changes.len());
    } else {
        info!("No changes since {:?}", log.last_update);
    }
    Ok(event)
}

/// Detailed tracking round-trip against the snapshot stored in `path`.
pub fn track_detailed_changes(
    current: &Table,
    path: &Path,
    key_candidates: &[String],
    position_fallback: bool,
    now: DateTime<Local>,
    retention: usize,
) -> Result<DetailedEvent> {
    let mut log: DetailedLog = load_or_default(path);
    let (event, record) =
        log.observe(current, key_candidates, position_fallback, now, retention)?;
    if record {
        save_document(path, &log)?;
        info!(
            "Detailed entry recorded in {path:?} ({} entries kept)",
            log.changes.len()
        );
    }
    Ok(event)
}

pub fn changes_summary(path: &Path, now: DateTime<Local>) -> Result<ChangesSummary> {
    if !path.exists() {
        return Ok(ChangeLog::default().summary(now));
    }
    let log: ChangeLog = load_document(path)?;
    Ok(log.summary(now))
}

pub fn recent_detailed_changes(path: &Path, limit: usize) -> Result<Vec<DetailedEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let log: DetailedLog = load_document(path)?;
    Ok(log.recent(limit).to_vec())
}

fn truncate_oldest<T>(entries: &mut Vec<T>, retention: usize) {
    let excess = entries.len().saturating_sub(retention);
    entries.drain(..excess);
}

pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Opening history file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing history file {path:?}"))
}

/// Missing files start an empty history; unreadable ones are replaced after a warning.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    match load_document(path) {
        Ok(document) => document,
        Err(err) => {
            warn!("Starting a fresh history: {err:#}");
            T::default()
        }
    }
}

pub fn save_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("Creating directory {dir:?}"))?;
    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Creating temporary file in {dir:?}"))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, document)
            .with_context(|| format!("Serializing history for {path:?}"))?;
        writer.flush()?;
    }
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Replacing history file {path:?}"))?;
    Ok(())
}
