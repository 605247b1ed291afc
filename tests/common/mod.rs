#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use promo_audit::table::Table;
use tempfile::{TempDir, tempdir};

pub const PROMO_HEADER: [&str; 12] = [
    "Игра",
    "Провайдер",
    "Старт промо",
    "Завершение промо",
    "Категория",
    "Название категории",
    "Проект",
    "Год",
    "Позиция",
    "RU",
    "KZ",
    "UA",
];

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes rows as a comma-separated sheet export, quoting every cell.
    pub fn write_rows(&self, name: &str, rows: &[Vec<&str>]) -> PathBuf {
        let contents = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.write(name, &format!("{contents}\n"))
    }

    pub fn write_promos(&self, name: &str, rows: &[[&str; 12]]) -> PathBuf {
        let mut grid = vec![PROMO_HEADER.to_vec()];
        grid.extend(rows.iter().map(|row| row.to_vec()));
        self.write_rows(name, &grid)
    }
}

/// Builds an in-memory table from string slices, first row as header.
pub fn table(rows: &[&[&str]]) -> Table {
    Table::from_grid(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
    .expect("table")
}

/// Promo sheet with the standard header followed by `rows`.
pub fn promo_table(rows: &[[&str; 12]]) -> Table {
    let mut grid: Vec<Vec<String>> = vec![PROMO_HEADER.iter().map(|cell| cell.to_string()).collect()];
    grid.extend(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect()),
    );
    Table::from_grid(grid).expect("promo table")
}

/// Fixture sheet covering every category, several projects and positions.
pub fn sample_promos() -> Vec<[&'static str; 12]> {
    vec![
        [
            "Book of Sun", "Rox", "01.01.2025", "15.01.2025", "ГЛАВНАЯ", "", "ROX, SOL",
            "2025", "", "3", "1", "",
        ],
        [
            "Gold Rush", "Jet", "10.01.2025", "20.01.2025", "ГЛАВНАЯ", "", "JET", "2025", "",
            "1", "", "2",
        ],
        [
            "Old Timer", "Lex", "01.01.2025", "31.01.2025", "ГЛАВНАЯ", "", "ROX", "2024", "",
            "2", "", "",
        ],
        [
            "Fruit Mania", "Fresh", "05.01.2025", "25.01.2025", "ГЛАВНАЯ", "", "all", "2025",
            "", "", "", "",
        ],
        [
            "Lucky Books", "Izzi", "01.02.2025", "28.02.2025", "ГЛАВНАЯ", "", "ROX", "2025", "",
            "4", "", "",
        ],
        [
            "Berry Blast", "Fresh", "01.01.2025", "31.01.2025", "КАТЕГОРИЯ", "Fruits", "ROX",
            "2025", "7", "99", "", "",
        ],
        [
            "Cherry Pop", "Jet", "01.01.2025", "31.01.2025", "КАТЕГОРИЯ", "Books", "ROX", "2025",
            "2", "", "", "",
        ],
        [
            "New Star", "Sol", "01.01.2025", "31.01.2025", "НОВИНКИ", "", "SOL", "2025", "5",
            "8", "", "",
        ],
    ]
}
