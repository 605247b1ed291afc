mod common;

use common::TestWorkspace;
use encoding_rs::{UTF_8, WINDOWS_1251};
use promo_audit::{
    error::{ErrorKind, PromoError},
    io_utils::{load_table, resolve_encoding, write_table},
    table::Table,
};

fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

#[test]
fn first_row_becomes_header_and_short_rows_are_padded() {
    let table = Table::from_grid(grid(&[&["a", "b", "c"], &["1"], &["1", "2", "3"]]))
        .expect("table");
    assert_eq!(table.headers(), ["a", "b", "c"]);
    assert_eq!(table.rows()[0], vec!["1", "", ""]);
    assert_eq!(table.cell(1, "c"), Some("3"));
    assert_eq!(table.cell(0, "zzz"), None);
}

#[test]
fn empty_grid_is_reported() {
    let err = Table::from_grid(Vec::new()).unwrap_err();
    assert_eq!(err, PromoError::EmptyData);
    assert_eq!(err.kind(), ErrorKind::InputShape);
}

#[test]
fn header_only_grid_has_no_rows() {
    let table = Table::from_grid(grid(&[&["a", "b"]])).expect("table");
    assert!(table.is_empty());
    assert_eq!(table.column_count(), 2);
}

#[test]
fn rows_wider_than_header_are_rejected() {
    let err = Table::from_grid(grid(&[&["a"], &["1"], &["1", "2"]])).unwrap_err();
    assert_eq!(
        err,
        PromoError::RowTooWide {
            row: 3,
            width: 2,
            expected: 1,
        }
    );
}

#[test]
fn duplicate_headers_are_rejected() {
    let err = Table::from_grid(grid(&[&["a", "a"]])).unwrap_err();
    assert_eq!(err, PromoError::DuplicateColumn("a".into()));
}

#[test]
fn load_table_reads_ragged_csv_exports() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("sheet.csv", "Игра,Провайдер,RU\nSun,Rox\n\"Moon, Inc\",Jet,2\n");
    let table = load_table(&path, None, UTF_8).expect("load");
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0], vec!["Sun", "Rox", ""]);
    assert_eq!(table.cell(1, "Игра"), Some("Moon, Inc"));
}

#[test]
fn load_table_picks_tab_for_tsv() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("sheet.tsv", "a\tb\n1\t2\n");
    let table = load_table(&path, None, UTF_8).expect("load");
    assert_eq!(table.cell(0, "b"), Some("2"));
}

#[test]
fn empty_export_fails_with_context() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("empty.csv", "");
    let err = load_table(&path, None, UTF_8).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PromoError>(),
        Some(&PromoError::EmptyData)
    );
}

#[test]
fn write_table_transcodes_output() {
    let workspace = TestWorkspace::new();
    let source = Table::from_grid(grid(&[&["Игра", "RU"], &["Солнце", "1"]])).expect("table");
    let path = workspace.path().join("report.csv");
    let encoding = resolve_encoding(Some("windows-1251")).expect("encoding");
    write_table(&source, Some(&path), b';', encoding).expect("write");

    let bytes = std::fs::read(&path).expect("read");
    assert!(std::str::from_utf8(&bytes).is_err());
    let reloaded = load_table(&path, Some(b';'), WINDOWS_1251).expect("reload");
    assert_eq!(reloaded, source);
}
