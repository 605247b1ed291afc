//! Promo placement filter.
//!
//! [`filter_promos`] narrows the promo sheet to the placements matching a
//! [`FilterQuery`] and reshapes them into the six-column report:
//! position, game, provider, period, projects, category.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use itertools::Itertools;
use log::debug;

use crate::{
    config::ColumnMap,
    data::{
        format_numeric, format_sheet_date, is_missing, parse_numeric, parse_sheet_date,
        split_tags,
    },
    error::{PromoError, Result},
    table::Table,
};

/// Placements dated in or before this year are ignored.
pub const LAST_EXCLUDED_YEAR: f64 = 2024.0;

/// Project tag that places a promo on every project.
pub const ALL_PROJECTS_TAG: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Main,
    Category,
    New,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Main, Category::Category, Category::New];

    /// Label used in the sheet's category column.
    pub fn label(self) -> &'static str {
        match self {
            Category::Main => "ГЛАВНАЯ",
            Category::Category => "КАТЕГОРИЯ",
            Category::New => "НОВИНКИ",
        }
    }

    fn alias(self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::Category => "category",
            Category::New => "new",
        }
    }

    pub fn requires_subcategory(self) -> bool {
        matches!(self, Category::Category)
    }

    /// Whether report positions come from the literal position column rather than the
    /// geography column.
    pub fn uses_literal_position(self) -> bool {
        matches!(self, Category::Category | Category::New)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = PromoError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| {
                category.label() == trimmed.to_uppercase()
                    || category.alias().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| PromoError::InvalidCategory {
                value: value.to_string(),
                allowed: Category::ALL.iter().map(|c| c.label()).join(", "),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geography {
    Ru,
    Kz,
    Ua,
    Ca,
    De,
    Au,
    Br,
    Pl,
    Pt,
    Ch,
    At,
}

impl Geography {
    pub const ALL: [Geography; 11] = [
        Geography::Ru,
        Geography::Kz,
        Geography::Ua,
        Geography::Ca,
        Geography::De,
        Geography::Au,
        Geography::Br,
        Geography::Pl,
        Geography::Pt,
        Geography::Ch,
        Geography::At,
    ];

    /// Country code, which is also the name of the geography's position column.
    pub fn code(self) -> &'static str {
        match self {
            Geography::Ru => "RU",
            Geography::Kz => "KZ",
            Geography::Ua => "UA",
            Geography::Ca => "CA",
            Geography::De => "DE",
            Geography::Au => "AU",
            Geography::Br => "BR",
            Geography::Pl => "PL",
            Geography::Pt => "PT",
            Geography::Ch => "CH",
            Geography::At => "AT",
        }
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Geography {
    type Err = PromoError;

    fn from_str(value: &str) -> Result<Self> {
        Geography::ALL
            .into_iter()
            .find(|geo| geo.code() == value)
            .ok_or_else(|| PromoError::InvalidGeography {
                value: value.to_string(),
                allowed: Geography::ALL.iter().map(|g| g.code()).join(", "),
            })
    }
}

/// How promo dates are matched against the query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatch {
    /// Start and end both equal the query bounds.
    Exact,
    /// Start equals the query start; end is ignored.
    ExactStart,
    /// End equals the query end; start is ignored.
    ExactEnd,
    /// The promo interval intersects the query interval.
    Overlap,
}

impl DateMatch {
    pub fn from_flags(exact_start: bool, exact_end: bool) -> Self {
        match (exact_start, exact_end) {
            (true, true) => DateMatch::Exact,
            (true, false) => DateMatch::ExactStart,
            (false, true) => DateMatch::ExactEnd,
            (false, false) => DateMatch::Overlap,
        }
    }

    fn matches(self, promo: (NaiveDate, NaiveDate), query: (NaiveDate, NaiveDate)) -> bool {
        let (start, end) = promo;
        let (query_start, query_end) = query;
        match self {
            DateMatch::Exact => start == query_start && end == query_end,
            DateMatch::ExactStart => start == query_start,
            DateMatch::ExactEnd => end == query_end,
            DateMatch::Overlap => start <= query_end && end >= query_start,
        }
    }
}

impl fmt::Display for DateMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DateMatch::Exact => "exact start and end",
            DateMatch::ExactStart => "exact start",
            DateMatch::ExactEnd => "exact end",
            DateMatch::Overlap => "period overlap",
        };
        f.write_str(text)
    }
}

/// Filter parameters as they arrive from the user, before validation.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub start: String,
    pub end: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub projects: Vec<String>,
    pub geography: String,
    pub exact_start: bool,
    pub exact_end: bool,
}

/// Validated filter query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    start: NaiveDate,
    end: NaiveDate,
    category: Category,
    subcategory: Option<String>,
    projects: Vec<String>,
    geography: Geography,
    date_match: DateMatch,
}

impl FilterQuery {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        category: Category,
        subcategory: Option<String>,
        projects: Vec<String>,
        geography: Geography,
        date_match: DateMatch,
    ) -> Result<Self> {
        let subcategory = subcategory.filter(|value| !is_missing(value));
        if category.requires_subcategory() && subcategory.is_none() {
            return Err(PromoError::MissingSubcategory(category.label().to_string()));
        }
        let projects = projects
            .into_iter()
            .map(|project| project.trim().to_string())
            .filter(|project| !project.is_empty())
            .collect();
        Ok(FilterQuery {
            start,
            end,
            category,
            subcategory,
            projects,
            geography,
            date_match,
        })
    }

    pub fn parse(params: &FilterParams) -> Result<Self> {
        let geography = params.geography.parse::<Geography>()?;
        let category = params.category.parse::<Category>()?;
        let start = parse_query_date("start", &params.start)?;
        let end = parse_query_date("end", &params.end)?;
        Self::new(
            start,
            end,
            category,
            params.subcategory.clone(),
            params.projects.clone(),
            geography,
            DateMatch::from_flags(params.exact_start, params.exact_end),
        )
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn geography(&self) -> Geography {
        self.geography
    }

    pub fn date_match(&self) -> DateMatch {
        self.date_match
    }

    /// True when the comma-joined project list of a row selects this query.
    pub fn matches_projects(&self, project_field: &str) -> bool {
        if self.projects.is_empty() {
            return true;
        }
        split_tags(project_field).any(|tag| {
            tag.eq_ignore_ascii_case(ALL_PROJECTS_TAG)
                || self.projects.iter().any(|project| project == tag)
        })
    }
}

fn parse_query_date(column: &str, value: &str) -> Result<NaiveDate> {
    parse_sheet_date(value).ok_or_else(|| PromoError::DateParse {
        column: column.to_string(),
        value: value.to_string(),
    })
}

struct ColumnIndexes {
    game: usize,
    provider: usize,
    start: usize,
    end: usize,
    category: usize,
    project: usize,
    subcategory: Option<usize>,
    year: Option<usize>,
    position: usize,
}

impl ColumnIndexes {
    fn resolve(table: &Table, columns: &ColumnMap, query: &FilterQuery) -> Result<Self> {
        let subcategory = if query.category.requires_subcategory() {
            Some(table.require_column(&columns.subcategory)?)
        } else {
            None
        };
        let position_column = if query.category.uses_literal_position() {
            columns.position.as_str()
        } else {
            query.geography.code()
        };
        Ok(ColumnIndexes {
            game: table.require_column(&columns.game)?,
            provider: table.require_column(&columns.provider)?,
            start: table.require_column(&columns.promo_start)?,
            end: table.require_column(&columns.promo_end)?,
            category: table.require_column(&columns.category)?,
            project: table.require_column(&columns.project)?,
            subcategory,
            year: table.column_index(&columns.year),
            position: table.require_column(position_column)?,
        })
    }

    fn required(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.start,
            self.end,
            self.category,
            self.project,
            self.game,
            self.provider,
        ]
        .into_iter()
        .chain(self.subcategory)
    }
}

struct ReportRow {
    position: Option<f64>,
    cells: Vec<String>,
}

/// Filters the promo sheet and returns the report table sorted by position.
///
/// Rows missing a required cell, or with a year that is not after
/// [`LAST_EXCLUDED_YEAR`], are dropped quietly. A promo date that does not parse aborts
/// the whole call with [`PromoError::DateParse`].
pub fn filter_promos(table: &Table, query: &FilterQuery, columns: &ColumnMap) -> Result<Table> {
    let idx = ColumnIndexes::resolve(table, columns, query)?;
    debug!(
        "Filtering {} row(s): {} .. {}, category {}, geography {}, mode {}",
        table.len(),
        format_sheet_date(query.start),
        format_sheet_date(query.end),
        query.category,
        query.geography,
        query.date_match
    );

    let eligible = table
        .rows()
        .iter()
        .filter(|row| idx.required().all(|col| !is_missing(&row[col])))
        .filter(|row| match idx.year {
            Some(col) => parse_numeric(&row[col]).is_some_and(|year| year > LAST_EXCLUDED_YEAR),
            None => true,
        })
        .collect::<Vec<_>>();

    let mut report = Vec::new();
    for row in eligible {
        let start = parse_promo_date(&columns.promo_start, &row[idx.start])?;
        let end = parse_promo_date(&columns.promo_end, &row[idx.end])?;
        if !query.date_match.matches((start, end), (query.start, query.end)) {
            continue;
        }
        if row[idx.category] != query.category.label() {
            continue;
        }
        if let Some(col) = idx.subcategory
            && Some(row[col].as_str()) != query.subcategory()
        {
            continue;
        }
        if !query.matches_projects(&row[idx.project]) {
            continue;
        }
        let position = parse_numeric(&row[idx.position]);
        report.push(ReportRow {
            position,
            cells: vec![
                position.map(format_numeric).unwrap_or_default(),
                row[idx.game].clone(),
                row[idx.provider].clone(),
                format!("{} - {}", format_sheet_date(start), format_sheet_date(end)),
                row[idx.project].clone(),
                row[idx.category].clone(),
            ],
        });
    }

    report.sort_by(|a, b| compare_positions(a.position, b.position));
    debug!("{} placement(s) matched", report.len());

    Table::new(
        report_headers(columns),
        report.into_iter().map(|row| row.cells).collect(),
    )
}

/// Header of the filter report, in output order.
pub fn report_headers(columns: &ColumnMap) -> Vec<String> {
    vec![
        columns.position.clone(),
        columns.game.clone(),
        columns.provider.clone(),
        columns.period.clone(),
        columns.projects.clone(),
        columns.category.clone(),
    ]
}

/// Removes report rows whose position did not coerce to a number.
pub fn drop_unpositioned(report: &mut Table, columns: &ColumnMap) {
    if let Some(col) = report.column_index(&columns.position) {
        report.retain_rows(|row| !is_missing(&row[col]));
    }
}

fn parse_promo_date(column: &str, value: &str) -> Result<NaiveDate> {
    parse_sheet_date(value).ok_or_else(|| PromoError::DateParse {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Ascending order with unknown positions last.
fn compare_positions(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        parse_sheet_date(value).expect("valid date")
    }

    #[test]
    fn date_match_modes_partition() {
        let promo = (date("01.01.2025"), date("10.01.2025"));
        let query = (date("05.01.2025"), date("20.01.2025"));
        assert!(DateMatch::Overlap.matches(promo, query));
        assert!(!DateMatch::ExactStart.matches(promo, query));
        assert!(DateMatch::ExactStart.matches(promo, (date("01.01.2025"), date("20.01.2025"))));
        assert!(DateMatch::ExactEnd.matches(promo, (date("02.02.2025"), date("10.01.2025"))));
        assert!(DateMatch::Exact.matches(promo, promo));
        assert!(!DateMatch::Exact.matches(promo, (date("01.01.2025"), date("11.01.2025"))));
    }

    #[test]
    fn overlap_is_inclusive_at_both_edges() {
        let promo = (date("01.01.2025"), date("10.01.2025"));
        assert!(DateMatch::Overlap.matches(promo, (date("10.01.2025"), date("15.01.2025"))));
        assert!(DateMatch::Overlap.matches(promo, (date("20.12.2024"), date("01.01.2025"))));
        assert!(!DateMatch::Overlap.matches(promo, (date("11.01.2025"), date("15.01.2025"))));
    }

    #[test]
    fn from_flags_selects_mode() {
        assert_eq!(DateMatch::from_flags(true, true), DateMatch::Exact);
        assert_eq!(DateMatch::from_flags(true, false), DateMatch::ExactStart);
        assert_eq!(DateMatch::from_flags(false, true), DateMatch::ExactEnd);
        assert_eq!(DateMatch::from_flags(false, false), DateMatch::Overlap);
    }

    #[test]
    fn category_parses_labels_and_aliases() {
        assert_eq!("КАТЕГОРИЯ".parse::<Category>(), Ok(Category::Category));
        assert_eq!("новинки".parse::<Category>(), Ok(Category::New));
        assert_eq!("Main".parse::<Category>(), Ok(Category::Main));
        let err = "OTHER".parse::<Category>().unwrap_err();
        assert!(matches!(err, PromoError::InvalidCategory { .. }));
    }

    #[test]
    fn geography_rejects_unknown_codes() {
        assert_eq!("KZ".parse::<Geography>(), Ok(Geography::Kz));
        let err = "XX".parse::<Geography>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(err.to_string().contains("RU, KZ, UA, CA, DE, AU, BR, PL, PT, CH, AT"));
    }

    #[test]
    fn positions_sort_with_unknown_last() {
        let mut positions = vec![Some(3.0), None, Some(1.0)];
        positions.sort_by(|a, b| compare_positions(*a, *b));
        assert_eq!(positions, vec![Some(1.0), Some(3.0), None]);
    }

    #[test]
    fn project_matching_respects_tag_boundaries() {
        let query = |projects: &[&str]| {
            FilterQuery::new(
                date("01.01.2025"),
                date("31.01.2025"),
                Category::Main,
                None,
                projects.iter().map(|p| p.to_string()).collect(),
                Geography::Ru,
                DateMatch::Overlap,
            )
            .expect("query")
        };
        assert!(query(&["ROX"]).matches_projects("ROX, SOL"));
        assert!(query(&["SOL"]).matches_projects("ROX, SOL"));
        assert!(!query(&["RO"]).matches_projects("ROX, SOL"));
        assert!(!query(&["OL"]).matches_projects("ROX, SOL"));
        assert!(query(&["JET"]).matches_projects("ALL"));
        assert!(query(&[]).matches_projects("anything"));
    }
}
