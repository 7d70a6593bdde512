//! Runtime configuration for stockdesk.
//!
//! Everything upstream-specific (endpoints, table position, timeouts) and
//! every indicator constant lives here instead of in the code paths that use
//! them. Configuration is read from an optional JSON file; missing keys fall
//! back to the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{InstrumentCode, MarketDate, ValidationError};

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "STOCKDESK_CONFIG";

/// Environment variable overriding the stockdesk home (`~/.stockdesk`).
pub const HOME_ENV_VAR: &str = "STOCKDESK_HOME";

/// File name of the persisted listing inside the cache directory.
pub const LISTING_CACHE_FILE: &str = "listing.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub sources: SourcesConfig,
    pub indicators: IndicatorConfig,
    pub listing: ListingConfig,
    pub report: ReportConfig,
}

impl DashboardConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, then `STOCKDESK_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.timeout_ms == 0 {
            return Err(invalid("sources.timeout_ms", "must be greater than zero"));
        }
        if self.indicators.institution_window == 0 {
            return Err(invalid(
                "indicators.institution_window",
                "must be greater than zero",
            ));
        }
        if self.indicators.moving_average_windows.contains(&0) {
            return Err(invalid(
                "indicators.moving_average_windows",
                "windows must be greater than zero",
            ));
        }
        if !self.indicators.foreign_scale.is_finite() {
            return Err(invalid("indicators.foreign_scale", "must be finite"));
        }
        if !self.indicators.institution_scale.is_finite() {
            return Err(invalid("indicators.institution_scale", "must be finite"));
        }
        if self.listing.ttl_secs == 0 {
            return Err(invalid("listing.ttl_secs", "must be greater than zero"));
        }
        InstrumentCode::parse(&self.listing.default_code)
            .map_err(|error| invalid("listing.default_code", error.to_string()))?;
        MarketDate::parse(&self.report.default_start)
            .map_err(|error| invalid("report.default_start", error.to_string()))?;
        if !self.report.file_name_pattern.contains("{code}") {
            return Err(invalid(
                "report.file_name_pattern",
                "must contain the {code} placeholder",
            ));
        }
        Ok(())
    }

    pub fn default_code(&self) -> Result<InstrumentCode, ValidationError> {
        InstrumentCode::parse(&self.listing.default_code)
    }

    pub fn default_start(&self) -> Result<MarketDate, ValidationError> {
        MarketDate::parse(&self.report.default_start)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Upstream endpoints and transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Daily chart feed; `{code}` and `{count}` are substituted.
    pub chart_url: String,
    /// Exchange listing endpoint (form POST).
    pub listing_url: String,
    pub listing_form: String,
    pub listing_referer: String,
    /// Portal main page holding the statements table; `{code}` is substituted.
    pub statements_url: String,
    /// Zero-based position of the statements table among the page's tables.
    pub statements_table_index: usize,
    /// Portal disclosure list; `{code}` is substituted.
    pub disclosures_url: String,
    /// Charset assumed when the portal omits one in `Content-Type`.
    pub portal_charset: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            chart_url: String::from(
                "https://fchart.stock.naver.com/sise.nhn?symbol={code}&timeframe=day&count={count}&requestType=0",
            ),
            listing_url: String::from(
                "http://data.krx.co.kr/comm/bldAttendant/getJsonData.cmd",
            ),
            listing_form: String::from(
                "bld=dbms/MDC/STAT/standard/MDCSTAT01901&mktId=ALL&share=1&csvxls_isNo=false",
            ),
            listing_referer: String::from(
                "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader/index.cmd?menuId=MDC0201020101",
            ),
            statements_url: String::from("https://finance.naver.com/item/main.naver?code={code}"),
            statements_table_index: 3,
            disclosures_url: String::from(
                "https://finance.naver.com/item/news_notice.naver?code={code}&page=1",
            ),
            portal_charset: String::from("euc-kr"),
            user_agent: String::from("Mozilla/5.0"),
            timeout_ms: 10_000,
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Indicator constants.
///
/// The flow scales and the rolling window are placeholders for a price-derived
/// stand-in; they carry no meaning beyond visual scaling until real
/// investor-type trading data is wired in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub foreign_scale: f64,
    pub institution_scale: f64,
    pub institution_window: usize,
    pub moving_average_windows: Vec<usize>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            foreign_scale: 1_000_000.0,
            institution_scale: 800_000.0,
            institution_window: 5,
            moving_average_windows: vec![5, 20, 60],
        }
    }
}

/// Instrument listing cache and fallback behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub ttl_secs: u64,
    /// Code used when a search matches nothing.
    pub default_code: String,
    /// Directory holding the persisted listing. Defaults to
    /// `$STOCKDESK_HOME/cache`.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            default_code: String::from("005930"),
            cache_dir: None,
        }
    }
}

impl ListingConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| resolve_stockdesk_home().join("cache"))
            .join(LISTING_CACHE_FILE)
    }
}

fn resolve_stockdesk_home() -> PathBuf {
    if let Some(path) = std::env::var_os(HOME_ENV_VAR) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".stockdesk");
    }

    PathBuf::from(".stockdesk")
}

/// Report assembly defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub default_start: String,
    /// Export file name; `{code}` is substituted.
    pub file_name_pattern: String,
    pub disclosure_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_start: String::from("2022-01-01"),
            file_name_pattern: String::from("{code}_report.xlsx"),
            disclosure_limit: 20,
        }
    }
}

impl ReportConfig {
    pub fn file_name(&self, code: &InstrumentCode) -> String {
        self.file_name_pattern.replace("{code}", code.as_str())
    }
}
