//! Edit-log view over the sheet's "logs" tab.

use std::cmp::Reverse;

use chrono::{Months, NaiveDateTime};

use crate::{
    data::parse_log_timestamp,
    error::Result,
    table::Table,
};

pub const DEFAULT_DATE_COLUMN: &str = "Дата";
pub const RETENTION_MONTHS: u32 = 3;

/// Entries from the last three months, newest first, at most `limit` of them.
///
/// Rows whose date does not parse are skipped. Ties keep sheet order.
pub fn recent_log_entries(
    logs: &Table,
    date_column: &str,
    now: NaiveDateTime,
    limit: Option<usize>,
) -> Result<Table> {
    let col = logs.require_column(date_column)?;
    let cutoff = now
        .checked_sub_months(Months::new(RETENTION_MONTHS))
        .unwrap_or(NaiveDateTime::MIN);

    let mut entries = logs
        .rows()
        .iter()
        .filter_map(|row| parse_log_timestamp(&row[col]).map(|stamp| (stamp, row)))
        .filter(|(stamp, _)| *stamp >= cutoff)
        .collect::<Vec<_>>();
    entries.sort_by_key(|(stamp, _)| Reverse(*stamp));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    Table::new(
        logs.headers().to_vec(),
        entries.into_iter().map(|(_, row)| row.clone()).collect(),
    )
}
