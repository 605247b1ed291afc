pub mod cli;
pub mod config;
pub mod data;
pub mod diff;
pub mod error;
pub mod filter;
pub mod history;
pub mod io_utils;
pub mod logs;
pub mod options;
pub mod session;
pub mod table;
pub mod tracker;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, SheetArgs},
    config::DashboardConfig,
    diff::TableDiff,
    filter::{Category, FilterParams, FilterQuery, Geography},
    session::Session,
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("promo_audit", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = DashboardConfig::load_or_default(cli.config.as_deref())?;
    debug!("Configuration: {config:?}");
    match cli.command {
        Commands::Filter(args) => handle_filter(&args, &config),
        Commands::Options(args) => handle_options(&args, &config),
        Commands::Track(args) => handle_track(&args, &config),
        Commands::TrackDetailed(args) => handle_track_detailed(&args, &config),
        Commands::Diff(args) => handle_diff(&args, &config),
        Commands::History(args) => handle_history(&args, &config),
        Commands::Logs(args) => handle_logs(&args),
        Commands::Login(args) => handle_login(&args, &config),
    }
}

fn load_sheet(sheet: &SheetArgs) -> Result<Table> {
    let encoding = io_utils::resolve_encoding(sheet.input_encoding.as_deref())?;
    let table = io_utils::load_table(&sheet.input, sheet.delimiter, encoding)?;
    info!(
        "Loaded {} row(s) x {} column(s) from '{}'",
        table.len(),
        table.column_count(),
        sheet.input.display()
    );
    Ok(table)
}

fn load_users(path: &Path, delimiter: Option<u8>) -> Result<Table> {
    io_utils::load_table(path, delimiter, io_utils::resolve_encoding(None)?)
        .with_context(|| format!("Loading credentials from {path:?}"))
}

fn handle_filter(args: &cli::FilterArgs, config: &DashboardConfig) -> Result<()> {
    let mut session = Session::new(Duration::from_secs(config.cache_ttl_secs));
    if config.require_login {
        let users_path = config
            .users
            .as_deref()
            .ok_or_else(|| anyhow!("Login is required but no credentials sheet is configured"))?;
        let (Some(user), Some(password)) = (args.user.as_deref(), args.password.as_deref())
        else {
            return Err(anyhow!("Login is required: pass --user and --password"));
        };
        session.login(&load_users(users_path, None)?, user, password)?;
    }

    let params = FilterParams {
        start: args.start.clone(),
        end: args.end.clone(),
        category: args.category.clone(),
        subcategory: args.subcategory.clone(),
        projects: args.projects.clone(),
        geography: args.geo.clone(),
        exact_start: args.exact_start,
        exact_end: args.exact_end,
    };
    let query = FilterQuery::parse(&params).context("Validating filter parameters")?;
    info!("Filtering with {} matching", query.date_match());

    let sheet = session.dataset(Instant::now(), || load_sheet(&args.sheet))?;
    let mut report = filter::filter_promos(sheet, &query, &config.columns)
        .with_context(|| format!("Filtering {:?}", args.sheet.input))?;
    if args.drop_unpositioned {
        filter::drop_unpositioned(&mut report, &config.columns);
    }
    info!("Found {} placement(s)", report.len());

    match &args.output {
        Some(path) => {
            let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
            let delimiter = args
                .output_delimiter
                .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
            io_utils::write_table(&report, Some(path.as_path()), delimiter, encoding)?;
            if !io_utils::is_dash(path) {
                info!("Report written to {path:?}");
            }
        }
        None => print!("{}", report.render()),
    }
    session.logout();
    Ok(())
}

fn handle_options(args: &cli::OptionsArgs, config: &DashboardConfig) -> Result<()> {
    let sheet = load_sheet(&args.sheet)?;
    let available = options::filter_options(&sheet, &config.columns)?;
    println!(
        "Categories: {}",
        Category::ALL.iter().map(|c| c.label()).join(", ")
    );
    println!(
        "Geographies: {}",
        Geography::ALL.iter().map(|g| g.code()).join(", ")
    );
    println!("Subcategories: {}", available.subcategories.join(", "));
    println!("Projects: {}", available.projects.join(", "));
    Ok(())
}

fn handle_track(args: &cli::TrackArgs, config: &DashboardConfig) -> Result<()> {
    let sheet = load_sheet(&args.sheet)?;
    let path = args
        .log
        .clone()
        .unwrap_or_else(|| config.tracking.coarse_log.clone());
    let event = history::track_changes(
        &sheet,
        &path,
        Local::now(),
        config.tracking.coarse_retention,
    )?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn handle_track_detailed(args: &cli::TrackDetailedArgs, config: &DashboardConfig) -> Result<()> {
    let sheet = load_sheet(&args.sheet)?;
    let path = args
        .log
        .clone()
        .unwrap_or_else(|| config.tracking.detailed_log.clone());
    let keys = key_candidates(&args.keys, config);
    let event = history::track_detailed_changes(
        &sheet,
        &path,
        &keys,
        args.row_index_fallback,
        Local::now(),
        config.tracking.detailed_retention,
    )?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn handle_diff(args: &cli::DiffArgs, config: &DashboardConfig) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let old = io_utils::load_table(&args.old, args.delimiter, encoding)?;
    let new = io_utils::load_table(&args.new, args.delimiter, encoding)?;
    let keys = key_candidates(&args.keys, config);
    let result = diff::diff_snapshots(&old, &new, &keys, args.row_index_fallback)
        .context("Comparing snapshots")?;
    info!(
        "{} added, {} deleted, {} modified ({} cell(s))",
        result.summary.rows_added,
        result.summary.rows_deleted,
        result.summary.rows_modified,
        result.summary.cells_changed
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_diff(&result));
    }
    Ok(())
}

fn handle_history(args: &cli::HistoryArgs, config: &DashboardConfig) -> Result<()> {
    if args.detailed {
        let path = log_path(&args.log, &config.tracking.detailed_log);
        let entries = history::recent_detailed_changes(&path, args.limit)?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let path = log_path(&args.log, &config.tracking.coarse_log);
        let summary = history::changes_summary(&path, Local::now())?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn handle_logs(args: &cli::LogsArgs) -> Result<()> {
    let sheet = load_sheet(&args.sheet)?;
    let view = logs::recent_log_entries(
        &sheet,
        &args.date_column,
        Local::now().naive_local(),
        args.limit,
    )?;
    info!("Showing {} log entr(ies)", view.len());
    print!("{}", view.render());
    Ok(())
}

fn handle_login(args: &cli::LoginArgs, config: &DashboardConfig) -> Result<()> {
    let path = args
        .users
        .as_deref()
        .or(config.users.as_deref())
        .ok_or_else(|| anyhow!("No credentials sheet given; pass --users"))?;
    let users = load_users(path, args.delimiter)?;
    let mut session = Session::new(Duration::from_secs(config.cache_ttl_secs));
    session.login(&users, &args.user, &args.password)?;
    println!("Logged in as {}", args.user);
    session.logout();
    Ok(())
}

fn key_candidates(keys: &[String], config: &DashboardConfig) -> Vec<String> {
    let explicit = keys
        .iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if explicit.is_empty() {
        config.columns.default_key_columns()
    } else {
        explicit
    }
}

fn log_path(provided: &Option<PathBuf>, configured: &Path) -> PathBuf {
    provided
        .clone()
        .unwrap_or_else(|| configured.to_path_buf())
}

/// Plain-text rendering of a diff: a summary line, then one block per change kind.
pub fn render_diff(diff: &TableDiff) -> String {
    let mut out = format!(
        "Rows added: {}, deleted: {}, modified: {}, cells changed: {}\n",
        diff.summary.rows_added,
        diff.summary.rows_deleted,
        diff.summary.rows_modified,
        diff.summary.cells_changed
    );
    let describe = |data: &[(String, String)]| {
        data.iter()
            .map(|(column, value)| format!("{column}={value}"))
            .join(", ")
    };
    for row in &diff.added_rows {
        out.push_str(&format!("+ {}\n", describe(row.data.as_slice())));
    }
    for row in &diff.deleted_rows {
        out.push_str(&format!("- {}\n", describe(row.data.as_slice())));
    }
    for row in &diff.modified_rows {
        out.push_str(&format!("~ {}\n", row.row_key));
        for change in &row.changes {
            out.push_str(&format!(
                "    {}: {} -> {}\n",
                change.column,
                change.old_value.as_deref().unwrap_or("<empty>"),
                change.new_value.as_deref().unwrap_or("<empty>")
            ));
        }
    }
    out
}
