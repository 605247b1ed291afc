//! Domain errors raised by the loader, the promo filter and the differ.
//!
//! Each variant belongs to one [`ErrorKind`] so callers can tell bad input apart from bad
//! data without matching on messages. Glue code (file I/O, JSON, CLI) wraps these in
//! `anyhow` with context instead of extending this enum.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PromoError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The grid or table does not have the shape an operation needs.
    InputShape,
    /// A query parameter is outside its allowed set.
    Validation,
    /// A cell could not be interpreted (for example an unparseable date).
    DataQuality,
    /// Row correlation was requested without any key.
    NoKeyColumns,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromoError {
    #[error("No data found in the requested range")]
    EmptyData,
    #[error("Row {row} has {width} cell(s) but the header defines {expected} column(s)")]
    RowTooWide {
        row: usize,
        width: usize,
        expected: usize,
    },
    #[error("Column '{0}' appears more than once in the header")]
    DuplicateColumn(String),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    #[error("Invalid geography '{value}'. Allowed values: {allowed}")]
    InvalidGeography { value: String, allowed: String },
    #[error("Invalid category '{value}'. Allowed values: {allowed}")]
    InvalidCategory { value: String, allowed: String },
    #[error("Category '{0}' requires a subcategory")]
    MissingSubcategory(String),
    #[error("Failed to parse '{value}' in '{column}' as a day.month.year date")]
    DateParse { column: String, value: String },
    #[error("No key columns available to correlate rows")]
    NoKeyColumns,
}

impl PromoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromoError::EmptyData
            | PromoError::RowTooWide { .. }
            | PromoError::DuplicateColumn(_)
            | PromoError::MissingColumn(_) => ErrorKind::InputShape,
            PromoError::InvalidGeography { .. }
            | PromoError::InvalidCategory { .. }
            | PromoError::MissingSubcategory(_) => ErrorKind::Validation,
            PromoError::DateParse { .. } => ErrorKind::DataQuality,
            PromoError::NoKeyColumns => ErrorKind::NoKeyColumns,
        }
    }
}
