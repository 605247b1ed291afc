//! Dashboard configuration.
//!
//! Everything has a default, so running without `--config` works against the standard
//! sheet layout. A YAML file only needs the keys it overrides:
//!
//! ```yaml
//! columns:
//!   game: Game
//!   provider: Provider
//! tracking:
//!   coarse_retention: 200
//! cache_ttl_secs: 300
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COARSE_LOG: &str = "changes_log.json";
pub const DEFAULT_DETAILED_LOG: &str = "detailed_changes_log.json";
pub const DEFAULT_COARSE_RETENTION: usize = 100;
pub const DEFAULT_DETAILED_RETENTION: usize = 50;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Column labels of the promo sheet, treated as opaque keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub game: String,
    pub provider: String,
    pub promo_start: String,
    pub promo_end: String,
    pub category: String,
    pub subcategory: String,
    pub project: String,
    pub year: String,
    pub position: String,
    pub period: String,
    pub projects: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            game: "Игра".into(),
            provider: "Провайдер".into(),
            promo_start: "Старт промо".into(),
            promo_end: "Завершение промо".into(),
            category: "Категория".into(),
            subcategory: "Название категории".into(),
            project: "Проект".into(),
            year: "Год".into(),
            position: "Позиция".into(),
            period: "Период".into(),
            projects: "Проекты".into(),
        }
    }
}

impl ColumnMap {
    /// Natural key of a placement, used to correlate rows between snapshots.
    pub fn default_key_columns(&self) -> Vec<String> {
        vec![
            self.game.clone(),
            self.provider.clone(),
            self.promo_start.clone(),
            self.promo_end.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub coarse_log: PathBuf,
    pub detailed_log: PathBuf,
    pub coarse_retention: usize,
    pub detailed_retention: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            coarse_log: PathBuf::from(DEFAULT_COARSE_LOG),
            detailed_log: PathBuf::from(DEFAULT_DETAILED_LOG),
            coarse_retention: DEFAULT_COARSE_RETENTION,
            detailed_retention: DEFAULT_DETAILED_RETENTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub columns: ColumnMap,
    pub tracking: TrackingConfig,
    pub cache_ttl_secs: u64,
    /// Credentials grid with `user` and `password` columns.
    pub users: Option<PathBuf>,
    /// When set, `filter` refuses to run without a successful login.
    pub require_login: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            columns: ColumnMap::default(),
            tracking: TrackingConfig::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            users: None,
            require_login: false,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
