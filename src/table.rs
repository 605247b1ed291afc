//! In-memory sheet table and its text rendering.
//!
//! A [`Table`] is a header plus rows of string cells, every row exactly as wide as the
//! header. [`Table::from_grid`] is the loader for raw sheet values; [`Table::render`] lays
//! a table out as aligned text for terminal output.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{PromoError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Persisted form of a [`Table`], checked by [`Table::new`] on the way in.
#[derive(Deserialize)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = PromoError;

    fn try_from(raw: RawTable) -> Result<Self> {
        Table::new(raw.headers, raw.rows)
    }
}

impl Table {
    /// Builds a table from a raw grid whose first row is the header.
    ///
    /// Rows shorter than the header are padded with empty cells, mirroring sheets that
    /// omit trailing blanks.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Result<Self> {
        let mut grid = grid.into_iter();
        let headers = grid.next().ok_or(PromoError::EmptyData)?;
        let rows = grid
            .enumerate()
            .map(|(idx, row)| pad_row(row, headers.len(), idx + 2))
            .collect::<Result<Vec<_>>>()?;
        Self::new(headers, rows)
    }

    /// Builds a table from an explicit header and rows of header width or shorter.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(headers.len());
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(PromoError::DuplicateColumn(header.clone()));
            }
        }
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| pad_row(row, headers.len(), idx + 2))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table { headers, rows })
    }

    pub fn empty(headers: Vec<String>) -> Result<Self> {
        Self::new(headers, Vec::new())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PromoError::MissingColumn(name.to_string()))
    }

    /// Cell value by row and column name; `None` when the column is absent.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(idx))
            .map(String::as_str)
    }

    /// Keeps only the rows whose predicate holds, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    pub fn render(&self) -> String {
        render_table(&self.headers, &self.rows)
    }
}

fn pad_row(mut row: Vec<String>, width: usize, line: usize) -> Result<Vec<String>> {
    if row.len() > width {
        return Err(PromoError::RowTooWide {
            row: line,
            width: row.len(),
            expected: width,
        });
    }
    row.resize(width, String::new());
    Ok(row)
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| display_width(header).max(1))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));

    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let rules = rule_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rules, &rule_widths));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI colour sequence, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
