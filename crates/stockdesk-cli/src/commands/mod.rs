mod chart;
mod disclosures;
mod financials;
mod report;
mod search;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use stockdesk_core::adapters::sample::sample_http_client;
use stockdesk_core::{
    Dashboard, DashboardConfig, Envelope, EnvelopeError, HttpClient, InstrumentCode,
    InstrumentSelection, ListingCache, MarketDate, ProviderId, ReqwestHttpClient, SectionStatus,
    LISTING_CACHE_FILE,
};
use tracing::debug;

use crate::cli::{Cli, Command, InstrumentArgs};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub cache_hit: bool,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            cache_hit: false,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let dashboard = build_dashboard(cli)?;
    let started = Instant::now();

    let command_result = match &cli.command {
        Command::Search(args) => search::run(args, &dashboard).await?,
        Command::Chart(args) => chart::run(args, &dashboard).await?,
        Command::Financials(args) => financials::run(args, &dashboard).await?,
        Command::Disclosures(args) => disclosures::run(args, &dashboard).await?,
        Command::Report(args) => report::run(args, &dashboard).await?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        cache_hit,
        source_chain,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut metadata = Metadata::new(source_chain, latency_ms, cache_hit)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta()?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

/// Config file (or defaults) with command-line overrides applied.
pub fn load_config(cli: &Cli) -> Result<DashboardConfig, CliError> {
    let mut config = DashboardConfig::resolve(cli.config.as_deref())?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.sources.timeout_ms = timeout_ms;
    }
    if let Some(cache_dir) = &cli.cache_dir {
        config.listing.cache_dir = Some(cache_dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn build_dashboard(cli: &Cli) -> Result<Dashboard, CliError> {
    let config = load_config(cli)?;
    let http_client: Arc<dyn HttpClient> = if cli.offline {
        Arc::new(sample_http_client(&config.sources))
    } else {
        Arc::new(ReqwestHttpClient::new(&config.sources.user_agent))
    };
    let cache_file = listing_cache_file(cli, &config);
    let ttl = config.listing.ttl();
    debug!(
        offline = cli.offline,
        timeout_ms = config.sources.timeout_ms,
        cache_file = ?cache_file,
        cache_mode = ?cli.cache_mode(),
        "dashboard configured"
    );

    let mut dashboard =
        Dashboard::from_http_client(http_client, config)?.with_cache_mode(cli.cache_mode());
    if let Some(path) = cache_file {
        dashboard = dashboard.with_listing_cache(ListingCache::persistent(ttl, path));
    }
    Ok(dashboard)
}

/// Persisted listing location. Offline runs keep the sample listing in
/// memory unless `--cache-dir` is given.
fn listing_cache_file(cli: &Cli, config: &DashboardConfig) -> Option<PathBuf> {
    if cli.offline {
        cli.cache_dir
            .as_ref()
            .map(|dir| dir.join(LISTING_CACHE_FILE))
    } else {
        Some(config.listing.cache_file())
    }
}

/// `--code` wins, then a non-blank query, then the configured default.
fn selection(args: &InstrumentArgs) -> Result<InstrumentSelection, CliError> {
    if let Some(code) = &args.code {
        return Ok(InstrumentSelection::Code(InstrumentCode::parse(code)?));
    }

    match args.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => Ok(InstrumentSelection::Query(query.to_owned())),
        _ => Ok(InstrumentSelection::Default),
    }
}

fn start_date(start: Option<&str>, config: &DashboardConfig) -> Result<MarketDate, CliError> {
    match start {
        Some(value) => Ok(MarketDate::parse(value)?),
        None => Ok(config.default_start()?),
    }
}

/// Envelope error for a failed section; `None` for every other status.
fn section_error(
    section: &str,
    status: &SectionStatus,
    source: ProviderId,
) -> Option<EnvelopeError> {
    let SectionStatus::Failed { code, message } = status else {
        return None;
    };
    EnvelopeError::new(code.as_str(), message.as_str())
        .ok()
        .map(|error| error.with_section(section).with_source(source))
}

fn source_chain(listing: Option<ProviderId>, market: ProviderId) -> Vec<ProviderId> {
    let mut chain: Vec<ProviderId> = listing.into_iter().collect();
    if !chain.contains(&market) {
        chain.push(market);
    }
    chain
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["stockdesk", "--offline"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn code_flag_wins_over_query() {
        let args = InstrumentArgs {
            query: Some(String::from("카카오")),
            code: Some(String::from("005930")),
        };
        assert!(matches!(
            selection(&args),
            Ok(InstrumentSelection::Code(code)) if code.as_str() == "005930"
        ));

        let blank = InstrumentArgs {
            query: Some(String::from("  ")),
            code: None,
        };
        assert!(matches!(selection(&blank), Ok(InstrumentSelection::Default)));
    }

    #[test]
    fn invalid_code_is_a_validation_error() {
        let args = InstrumentArgs {
            query: None,
            code: Some(String::from("00-593")),
        };
        assert!(matches!(selection(&args), Err(CliError::Validation(_))));
    }

    #[test]
    fn timeout_flag_overrides_config_and_zero_is_rejected() {
        let config = load_config(&parse(&["--timeout-ms", "750", "search", "x"])).expect("config");
        assert_eq!(config.sources.timeout_ms, 750);

        let error = load_config(&parse(&["--timeout-ms", "0", "search", "x"]))
            .expect_err("zero timeout");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn offline_runs_persist_listing_only_with_explicit_cache_dir() {
        let cli = parse(&["search", "x"]);
        let config = load_config(&cli).expect("config");
        assert_eq!(listing_cache_file(&cli, &config), None);

        let cli = parse(&["--cache-dir", "/tmp/stockdesk-cache", "search", "x"]);
        let config = load_config(&cli).expect("config");
        assert_eq!(
            listing_cache_file(&cli, &config),
            Some(PathBuf::from("/tmp/stockdesk-cache").join(LISTING_CACHE_FILE))
        );
        assert_eq!(
            config.listing.cache_dir,
            Some(PathBuf::from("/tmp/stockdesk-cache"))
        );
    }

    #[test]
    fn only_failed_sections_become_envelope_errors() {
        let failed = SectionStatus::Failed {
            code: String::from("source.timeout"),
            message: String::from("timed out after 25ms"),
        };
        let error = section_error("financials", &failed, ProviderId::Naver).expect("error");
        assert_eq!(error.code, "source.timeout");
        assert_eq!(error.section.as_deref(), Some("financials"));
        assert_eq!(error.source, Some(ProviderId::Naver));

        assert!(section_error("financials", &SectionStatus::NoData, ProviderId::Naver).is_none());
    }

    #[tokio::test]
    async fn offline_search_returns_listing_matches() {
        let envelope = run(&parse(&["search", "삼성"])).await.expect("envelope");

        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.meta.source_chain, vec![ProviderId::Krx]);
        let results = envelope.data["results"].as_array().expect("results");
        assert!(!results.is_empty());
        assert_eq!(results[0]["code"], "005930");
    }

    #[tokio::test]
    async fn offline_chart_resolves_query_and_derives_series() {
        let envelope = run(&parse(&[
            "chart",
            "SK하이닉스",
            "--granularity",
            "monthly",
            "--start",
            "2023-01-01",
        ]))
        .await
        .expect("envelope");

        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.data["instrument"]["code"], "000660");
        assert_eq!(envelope.data["resolved_by"], "search");
        assert_eq!(envelope.data["chart"]["granularity"], "monthly");
        assert_eq!(envelope.data["chart"]["derived"]["synthetic"], true);
        assert_eq!(
            envelope.meta.source_chain,
            vec![ProviderId::Krx, ProviderId::Naver]
        );
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_default_with_warning() {
        let envelope = run(&parse(&["chart", "no-such-company", "--start", "2024-01-01"]))
            .await
            .expect("envelope");

        assert_eq!(envelope.data["instrument"]["code"], "005930");
        assert_eq!(envelope.data["resolved_by"], "default");
        assert!(!envelope.meta.warnings.is_empty());
    }

    #[tokio::test]
    async fn disclosures_limit_and_zero_limit() {
        let envelope = run(&parse(&["disclosures", "005930", "--limit", "3"]))
            .await
            .expect("envelope");
        assert_eq!(
            envelope.data["entries"].as_array().map(Vec::len),
            Some(3)
        );

        let error = run(&parse(&["disclosures", "005930", "--limit", "0"]))
            .await
            .expect_err("zero limit");
        assert!(matches!(error, CliError::Command(_)));
    }
}
