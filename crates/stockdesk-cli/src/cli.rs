//! CLI argument definitions for stockdesk.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Search the exchange listing by name or code prefix |
//! | `chart` | Price bars with flow estimates, moving averages and day change |
//! | `financials` | Financial statement table |
//! | `disclosures` | Recent disclosure headlines with categories |
//! | `report` | Full dashboard, exported as a two-sheet spreadsheet |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--timeout-ms` | config | Per-request timeout in ms |
//! | `--config` | `$STOCKDESK_CONFIG` | JSON config file |
//! | `--offline` | `false` | Serve requests from built-in sample payloads |
//! | `--cache-dir` | `$STOCKDESK_HOME/cache` | Directory of the persisted listing |
//! | `--refresh-listing` | `false` | Refetch the listing and overwrite the cache |
//! | `--no-listing-cache` | `false` | Fetch the listing without reading or writing the cache |
//!
//! # Examples
//!
//! ```bash
//! stockdesk search 삼성
//! stockdesk chart 삼성전자 --granularity weekly --start 2023-01-01 --format table
//! stockdesk chart --code 000660 --pretty
//! stockdesk report --code 005930 --out ./005930_report.xlsx --strict
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stockdesk_core::{CacheMode, Granularity};

/// Single-instrument KRX stock dashboard.
#[derive(Debug, Parser)]
#[command(
    name = "stockdesk",
    author,
    version,
    about = "Single-instrument KRX stock dashboard",
    long_about = "stockdesk resolves one listed instrument, fetches its daily price history, \
financial statement table and recent disclosures, and derives price-based flow estimates \
and moving averages.\n\
\n\
Flow columns are synthetic estimates computed from price change, not reported \
investor trading data.\n\
\n\
Use 'stockdesk <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Per-request timeout in milliseconds; overrides the config file.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// JSON config file. Falls back to $STOCKDESK_CONFIG, then built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Answer every request from built-in sample payloads instead of the network.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Directory of the persisted instrument listing. Offline runs only
    /// persist when this is given.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Refetch the instrument listing and overwrite the cached copy.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "no_listing_cache")]
    pub refresh_listing: bool,

    /// Fetch the instrument listing without reading or writing the cache.
    #[arg(long, global = true, default_value_t = false)]
    pub no_listing_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn cache_mode(&self) -> CacheMode {
        if self.no_listing_cache {
            CacheMode::Bypass
        } else if self.refresh_listing {
            CacheMode::Refresh
        } else {
            CacheMode::Use
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search instruments by name substring or code prefix.
    ///
    ///   stockdesk search 삼성
    ///   stockdesk search 0000 --limit 5
    Search(SearchArgs),

    /// Price bars, flow estimates, moving averages and day change.
    ///
    ///   stockdesk chart 카카오
    ///   stockdesk chart --code 035720 --granularity monthly
    Chart(ChartArgs),

    /// Financial statement table for one code.
    Financials(FinancialsArgs),

    /// Recent disclosure headlines for one code.
    Disclosures(DisclosuresArgs),

    /// Full dashboard; writes the spreadsheet export.
    Report(ReportArgs),
}

/// Instrument selection shared by `chart` and `report`.
#[derive(Debug, Clone, Args)]
pub struct InstrumentArgs {
    /// Name fragment or code prefix looked up in the exchange listing.
    pub query: Option<String>,

    /// Exact instrument code; skips the listing search.
    #[arg(long)]
    pub code: Option<String>,
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Name substring or code prefix. Empty matches everything.
    pub query: String,

    /// Maximum number of results to return.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

/// Arguments for the `chart` command.
#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub instrument: InstrumentArgs,

    /// Bar size: daily, weekly or monthly.
    #[arg(long, default_value = "daily")]
    pub granularity: Granularity,

    /// First date (YYYY-MM-DD). Defaults to the configured start date.
    #[arg(long)]
    pub start: Option<String>,
}

/// Arguments for the `financials` command.
#[derive(Debug, Args)]
pub struct FinancialsArgs {
    /// Instrument code, e.g. 005930.
    pub code: String,
}

/// Arguments for the `disclosures` command.
#[derive(Debug, Args)]
pub struct DisclosuresArgs {
    /// Instrument code, e.g. 005930.
    pub code: String,

    /// Maximum number of headlines. Defaults to the configured limit.
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for the `report` command.
#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub instrument: InstrumentArgs,

    /// Bar size: daily, weekly or monthly.
    #[arg(long, default_value = "daily")]
    pub granularity: Granularity,

    /// First date (YYYY-MM-DD). Defaults to the configured start date.
    #[arg(long)]
    pub start: Option<String>,

    /// Spreadsheet path. Defaults to the configured file name pattern.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chart_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stockdesk",
            "chart",
            "삼성전자",
            "--granularity",
            "weekly",
            "--offline",
            "--timeout-ms",
            "250",
        ])
        .expect("parse");

        assert!(cli.offline);
        assert_eq!(cli.timeout_ms, Some(250));
        let Command::Chart(args) = cli.command else {
            panic!("expected chart command");
        };
        assert_eq!(args.granularity, Granularity::Weekly);
        assert_eq!(args.instrument.query.as_deref(), Some("삼성전자"));
        assert_eq!(args.instrument.code, None);
    }

    #[test]
    fn rejects_unknown_granularity() {
        let result = Cli::try_parse_from(["stockdesk", "chart", "--granularity", "hourly"]);
        assert!(result.is_err());
    }

    #[test]
    fn report_accepts_code_and_out() {
        let cli = Cli::try_parse_from([
            "stockdesk",
            "report",
            "--code",
            "000660",
            "--out",
            "/tmp/x.xlsx",
        ])
        .expect("parse");
        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.instrument.code.as_deref(), Some("000660"));
        assert_eq!(args.granularity, Granularity::Daily);
        assert_eq!(args.out, Some(PathBuf::from("/tmp/x.xlsx")));
    }

    #[test]
    fn listing_cache_flags_map_to_modes() {
        let parse = |args: &[&str]| {
            let mut argv = vec!["stockdesk", "search", "x"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv)
        };

        assert_eq!(parse(&[]).expect("parse").cache_mode(), CacheMode::Use);
        assert_eq!(
            parse(&["--refresh-listing"]).expect("parse").cache_mode(),
            CacheMode::Refresh
        );
        assert_eq!(
            parse(&["--no-listing-cache"]).expect("parse").cache_mode(),
            CacheMode::Bypass
        );
        assert!(parse(&["--refresh-listing", "--no-listing-cache"]).is_err());
    }
}
