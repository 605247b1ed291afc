use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Filter, track and diff promotional slot placements",
    long_about = None
)]
pub struct Cli {
    /// YAML configuration file (column labels, history files, retention, login)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Filter promo placements by period, category, projects and geography
    Filter(FilterArgs),
    /// List the categories, geographies, subcategories and projects available for filtering
    Options(OptionsArgs),
    /// Detect whether the sheet changed since the last run (content hash)
    Track(TrackArgs),
    /// Record row-level changes since the last run
    TrackDetailed(TrackDetailedArgs),
    /// Compare two sheet exports row by row
    Diff(DiffArgs),
    /// Show the recorded change history
    History(HistoryArgs),
    /// Show recent entries of the edit log sheet
    Logs(LogsArgs),
    /// Check a user name and password against the credentials sheet
    Login(LoginArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SheetArgs {
    /// Sheet export (CSV or TSV, '-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
    /// First day of the period (dd.mm.yyyy)
    #[arg(long)]
    pub start: String,
    /// Last day of the period (dd.mm.yyyy)
    #[arg(long)]
    pub end: String,
    /// Category label or alias (main, category, new)
    #[arg(long)]
    pub category: String,
    /// Subcategory name, required for the "category" category
    #[arg(long)]
    pub subcategory: Option<String>,
    /// Project tags to include (repeatable or comma-separated); all projects when omitted
    #[arg(long = "project", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub projects: Vec<String>,
    /// Geography code whose position column is reported (RU, KZ, UA, ...)
    #[arg(long)]
    pub geo: String,
    /// Match promos starting exactly on --start
    #[arg(long = "exact-start")]
    pub exact_start: bool,
    /// Match promos ending exactly on --end
    #[arg(long = "exact-end")]
    pub exact_end: bool,
    /// Drop placements without a numeric position
    #[arg(long = "drop-unpositioned")]
    pub drop_unpositioned: bool,
    /// Write the report as CSV to this file ('-' for stdout) instead of printing a table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter for CSV output (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for CSV output (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// User name, required when the configuration enables login
    #[arg(long)]
    pub user: Option<String>,
    /// Password for --user
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
}

#[derive(Debug, Args)]
pub struct TrackArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
    /// History file (defaults to the configured coarse log)
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TrackDetailedArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
    /// History file (defaults to the configured detailed log)
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Key columns correlating rows (defaults to game, provider, promo start and end)
    #[arg(long = "key", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub keys: Vec<String>,
    /// Correlate rows by position when no key column is shared by both snapshots
    #[arg(long = "row-index-fallback")]
    pub row_index_fallback: bool,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Earlier sheet export
    #[arg(long)]
    pub old: PathBuf,
    /// Later sheet export
    #[arg(long)]
    pub new: PathBuf,
    /// Key columns correlating rows (defaults to game, provider, promo start and end)
    #[arg(long = "key", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub keys: Vec<String>,
    /// Correlate rows by position when no key column is shared by both snapshots
    #[arg(long = "row-index-fallback")]
    pub row_index_fallback: bool,
    /// Print the diff as JSON
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character for both inputs
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of both inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// History file (defaults to the configured coarse or detailed log)
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Show detailed entries instead of the coarse summary
    #[arg(long)]
    pub detailed: bool,
    /// Number of detailed entries to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,
    /// Column holding the entry date
    #[arg(long = "date-column", default_value = crate::logs::DEFAULT_DATE_COLUMN)]
    pub date_column: String,
    /// Maximum number of entries to show
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Credentials sheet with 'user' and 'password' columns (defaults to the configured one)
    #[arg(long)]
    pub users: Option<PathBuf>,
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub password: String,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn projects_accept_commas_and_repeats() {
        let cli = Cli::parse_from([
            "promo-audit",
            "filter",
            "-i",
            "sheet.csv",
            "--start",
            "01.01.2025",
            "--end",
            "31.01.2025",
            "--category",
            "main",
            "--geo",
            "RU",
            "--project",
            "ROX,SOL",
            "--project",
            "JET",
        ]);
        match cli.command {
            Commands::Filter(args) => assert_eq!(args.projects, vec!["ROX", "SOL", "JET"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parse_delimiter_accepts_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
    }
}
