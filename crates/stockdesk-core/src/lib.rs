//! # Stockdesk Core
//!
//! Data pipeline behind the `stockdesk` single-instrument dashboard.
//!
//! ## Overview
//!
//! One interaction runs a linear pipeline:
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────┐   ┌────────────────┐   ┌─────────────┐
//! │ Source connector │──▶│  Normalizer  │──▶│ Indicator      │──▶│ Report      │
//! │ (adapters)       │   │ (normalize)  │   │ (indicators)   │   │ (report)    │
//! └──────────────────┘   └──────────────┘   └────────────────┘   └─────────────┘
//! ```
//!
//! The instrument listing is the only state kept across interactions; it
//! lives in a TTL [`ListingCache`] behind the [`InstrumentDirectory`].
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Exchange listing and finance portal connectors, offline sample transport |
//! | [`cache`] | Listing cache and cache modes |
//! | [`config`] | JSON configuration with defaults |
//! | [`data_source`] | Connector trait, fetch outcomes, source errors |
//! | [`directory`] | Instrument search and resolution |
//! | [`domain`] | Domain models |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`indicators`] | Flow estimates, moving averages, day change |
//! | [`normalize`] | Weekly and monthly resampling |
//! | [`report`] | Dashboard assembly |
//! | [`source`] | Provider identifiers |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stockdesk_core::{
//!     Dashboard, DashboardConfig, Granularity, InstrumentSelection, MarketDate,
//!     ReqwestHttpClient,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DashboardConfig::default();
//! let client = Arc::new(ReqwestHttpClient::new(&config.sources.user_agent));
//! let dashboard = Dashboard::from_http_client(client, config)?;
//!
//! let report = dashboard
//!     .report(
//!         &InstrumentSelection::Query(String::from("삼성전자")),
//!         Granularity::Weekly,
//!         MarketDate::parse("2022-01-01")?,
//!     )
//!     .await;
//!
//! for (section, status) in report.sections() {
//!     println!("{section}: {status:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Connectors return `Result<Fetched<T>, SourceError>` so that "nothing
//! there", "zero rows" and "fetch failed" stay distinguishable:
//!
//! ```rust
//! use stockdesk_core::{Fetched, SourceError, SourceErrorKind};
//!
//! fn describe(outcome: Result<Fetched<Vec<u8>>, SourceError>) -> &'static str {
//!     match outcome {
//!         Ok(Fetched::Data(_)) => "loaded",
//!         Ok(Fetched::NoData) => "no data",
//!         Ok(Fetched::Empty) => "empty",
//!         Err(error) if error.kind() == SourceErrorKind::Timeout => "timed out",
//!         Err(_) => "failed",
//!     }
//! }
//!
//! assert_eq!(describe(Err(SourceError::timeout("slow"))), "timed out");
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod directory;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod normalize;
pub mod report;
pub mod source;

pub use adapters::{KrxAdapter, NaverAdapter};

pub use cache::{CacheMode, CachedListing, ListingCache};

pub use config::{
    ConfigError, DashboardConfig, IndicatorConfig, ListingConfig, ReportConfig, SourcesConfig,
    CONFIG_ENV_VAR, HOME_ENV_VAR, LISTING_CACHE_FILE,
};

pub use data_source::{
    CapabilitySet, DataSource, Endpoint, FetchResult, Fetched, PriceHistoryRequest, SourceError,
    SourceErrorKind, SourceFuture,
};

pub use directory::{
    builtin_instruments, search_instruments, InstrumentDirectory, InstrumentSelection,
    ListingLookup, Resolution, ResolvedBy,
};

pub use domain::{
    DisclosureCategory, DisclosureEntry, FinancialStatementTable, Granularity, Instrument,
    InstrumentCode, MarketDate, PriceBar, PriceSeries, StatementRow,
};

pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

pub use error::{CoreError, ValidationError};

pub use http_client::{
    FixtureHttpClient, FixtureReply, HttpClient, HttpError, HttpErrorKind, HttpMethod,
    HttpRequest, HttpResponse, ReqwestHttpClient,
};

pub use indicators::{
    day_change, DayChange, DerivedSeries, FlowEstimate, FlowModel, MovingAverage,
    PriceMomentumFlow, VolumeDirection, SYNTHETIC_CAVEAT,
};

pub use normalize::resample;

pub use report::{
    ChartView, Dashboard, DashboardReport, DisclosuresView, FinancialsView, SectionStatus,
};

pub use source::ProviderId;
