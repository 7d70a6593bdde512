//! Data source trait, fetch outcomes and error types.
//!
//! Every connector call resolves to `Result<Fetched<T>, SourceError>`:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Ok(Fetched::Data(t))` | Upstream answered and at least one row parsed |
//! | `Ok(Fetched::Empty)` | Upstream answered, markup/schema matched, zero rows |
//! | `Ok(Fetched::NoData)` | Upstream answered but has nothing for this instrument |
//! | `Err(SourceError)` | Timeout, transport, status, schema or decode failure |
//!
//! Callers that want the best-effort "blank section" behaviour downgrade the
//! error themselves (see [`crate::report`]); connectors never swallow it.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{
    DisclosureEntry, FinancialStatementTable, Instrument, InstrumentCode, MarketDate, PriceSeries,
    ProviderId,
};

/// Data endpoint type used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Listing,
    PriceHistory,
    Statements,
    Disclosures,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::PriceHistory => "price_history",
            Self::Statements => "statements",
            Self::Disclosures => "disclosures",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub listing: bool,
    pub price_history: bool,
    pub statements: bool,
    pub disclosures: bool,
}

impl CapabilitySet {
    pub const fn new(
        listing: bool,
        price_history: bool,
        statements: bool,
        disclosures: bool,
    ) -> Self {
        Self {
            listing,
            price_history,
            statements,
            disclosures,
        }
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Listing => self.listing,
            Endpoint::PriceHistory => self.price_history,
            Endpoint::Statements => self.statements,
            Endpoint::Disclosures => self.disclosures,
        }
    }
}

/// Connector error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    UnsupportedEndpoint,
    /// The fixed per-call timeout elapsed.
    Timeout,
    /// Connection or protocol failure below HTTP status level.
    Transport,
    /// Upstream answered with a non-success status.
    UpstreamStatus,
    /// Markup or payload no longer has the expected shape.
    Schema,
    /// Body could not be decoded (charset, JSON, numbers).
    Decode,
    InvalidRequest,
}

/// Structured connector error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self::new(
            SourceErrorKind::UnsupportedEndpoint,
            format!("endpoint '{endpoint}' is not supported by this source"),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transport, message)
    }

    pub fn upstream_status(status: u16, url: &str) -> Self {
        Self::new(
            SourceErrorKind::UpstreamStatus,
            format!("upstream returned status {status} for {url}"),
        )
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Schema, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Decode, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::UpstreamStatus => "source.upstream_status",
            SourceErrorKind::Schema => "source.schema",
            SourceErrorKind::Decode => "source.decode",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Successful connector outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    /// Upstream answered but has no section/series for the instrument.
    NoData,
    /// Upstream answered and parsed cleanly into zero rows.
    Empty,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Self::Data(value) => Fetched::Data(f(value)),
            Self::NoData => Fetched::NoData,
            Self::Empty => Fetched::Empty,
        }
    }

    pub fn data(self) -> Option<T> {
        match self {
            Self::Data(value) => Some(value),
            Self::NoData | Self::Empty => None,
        }
    }

    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

impl<T> Fetched<Vec<T>> {
    /// `Empty` for an empty vector, `Data` otherwise.
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Data(rows)
        }
    }
}

pub type FetchResult<T> = Result<Fetched<T>, SourceError>;

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = FetchResult<T>> + Send + 'a>>;

/// Request payload for price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistoryRequest {
    pub code: InstrumentCode,
    pub start: MarketDate,
    pub end: MarketDate,
}

impl PriceHistoryRequest {
    pub fn new(code: InstrumentCode, start: MarketDate) -> Result<Self, SourceError> {
        Self::with_end(code, start, MarketDate::today())
    }

    pub fn with_end(
        code: InstrumentCode,
        start: MarketDate,
        end: MarketDate,
    ) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::invalid_request(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { code, start, end })
    }

    /// Calendar days covered, inclusive; an upper bound on trading days.
    pub fn span_days(&self) -> u64 {
        u64::try_from(self.start.days_until(self.end))
            .unwrap_or(0)
            .saturating_add(1)
    }
}

/// Source connector contract.
///
/// A connector issues at most one request per call, bounded by its configured
/// timeout, and never retries.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    /// Full instrument reference list.
    fn listing<'a>(&'a self) -> SourceFuture<'a, Vec<Instrument>>;

    /// Native (daily) bars from `req.start` onward.
    fn price_history<'a>(&'a self, req: PriceHistoryRequest) -> SourceFuture<'a, PriceSeries>;

    fn statements<'a>(&'a self, code: &'a InstrumentCode)
        -> SourceFuture<'a, FinancialStatementTable>;

    fn disclosures<'a>(&'a self, code: &'a InstrumentCode)
        -> SourceFuture<'a, Vec<DisclosureEntry>>;
}
