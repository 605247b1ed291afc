//! Choice lists offered alongside the promo filter.

use std::collections::BTreeSet;

use crate::{
    config::ColumnMap,
    data::{is_missing, split_tags},
    error::Result,
    filter::Category,
    table::Table,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub subcategories: Vec<String>,
    pub projects: Vec<String>,
}

/// Distinct project tags across rows of a known category, sorted.
pub fn project_tags(table: &Table, columns: &ColumnMap) -> Result<Vec<String>> {
    let category = table.require_column(&columns.category)?;
    let project = table.require_column(&columns.project)?;
    let tags = table
        .rows()
        .iter()
        .filter(|row| Category::ALL.iter().any(|c| row[category] == c.label()))
        .flat_map(|row| split_tags(&row[project]))
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    Ok(tags.into_iter().collect())
}

/// Distinct non-empty subcategory names of the "КАТЕГОРИЯ" category, sorted.
pub fn subcategories(table: &Table, columns: &ColumnMap) -> Result<Vec<String>> {
    let category = table.require_column(&columns.category)?;
    let subcategory = table.require_column(&columns.subcategory)?;
    let names = table
        .rows()
        .iter()
        .filter(|row| row[category] == Category::Category.label())
        .map(|row| row[subcategory].as_str())
        .filter(|name| !is_missing(name))
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    Ok(names.into_iter().collect())
}

pub fn filter_options(table: &Table, columns: &ColumnMap) -> Result<FilterOptions> {
    Ok(FilterOptions {
        subcategories: subcategories(table, columns)?,
        projects: project_tags(table, columns)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Table {
        Table::from_grid(
            [
                ["Категория", "Название категории", "Проект"],
                ["ГЛАВНАЯ", "", "ROX, SOL"],
                ["КАТЕГОРИЯ", "Fruits", "JET"],
                ["КАТЕГОРИЯ", "Books", "SOL,  FRESH"],
                ["КАТЕГОРИЯ", "", "IZZI"],
                ["АРХИВ", "Old", "LEX"],
            ]
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
        )
        .expect("table")
    }

    #[test]
    fn project_tags_are_split_deduplicated_and_sorted() {
        let tags = project_tags(&sheet(), &ColumnMap::default()).expect("tags");
        assert_eq!(tags, vec!["FRESH", "IZZI", "JET", "ROX", "SOL"]);
    }

    #[test]
    fn subcategories_skip_blanks_and_other_categories() {
        let names = subcategories(&sheet(), &ColumnMap::default()).expect("names");
        assert_eq!(names, vec!["Books", "Fruits"]);
    }
}
