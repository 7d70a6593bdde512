//! Dashboard assembly: resolve → fetch → resample → derive → tabulate.
//!
//! Sections are fetched one after another. A section whose fetch fails is
//! kept in the report with empty data and a [`SectionStatus::Failed`] status
//! instead of failing the whole report.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::{KrxAdapter, NaverAdapter};
use crate::cache::{CacheMode, ListingCache};
use crate::config::DashboardConfig;
use crate::data_source::{DataSource, FetchResult, Fetched, PriceHistoryRequest};
use crate::directory::{InstrumentDirectory, InstrumentSelection, ListingLookup, Resolution, ResolvedBy};
use crate::http_client::HttpClient;
use crate::indicators::{day_change, DayChange, DerivedSeries, FlowModel, PriceMomentumFlow};
use crate::normalize::resample;
use crate::{
    CoreError, DisclosureEntry, FinancialStatementTable, Granularity, Instrument, InstrumentCode,
    MarketDate, PriceBar, PriceSeries, ProviderId,
};

/// Outcome of one report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Loaded,
    /// Upstream has nothing for this instrument.
    NoData,
    /// Upstream answered with zero rows.
    Empty,
    /// Fetch or parse failed; the section holds empty data.
    Failed { code: String, message: String },
}

impl SectionStatus {
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn warning(&self, section: &str) -> Option<String> {
        match self {
            Self::Failed { message, .. } => Some(format!("{section} unavailable: {message}")),
            Self::NoData => Some(format!("{section}: no data for this instrument")),
            Self::Loaded | Self::Empty => None,
        }
    }
}

fn settle<T: Default>(section: &'static str, outcome: FetchResult<T>) -> (T, SectionStatus) {
    match outcome {
        Ok(Fetched::Data(data)) => (data, SectionStatus::Loaded),
        Ok(Fetched::NoData) => (T::default(), SectionStatus::NoData),
        Ok(Fetched::Empty) => (T::default(), SectionStatus::Empty),
        Err(error) => {
            warn!(section, code = error.code(), %error, "section failed, continuing with empty data");
            (
                T::default(),
                SectionStatus::Failed {
                    code: error.code().to_owned(),
                    message: error.message().to_owned(),
                },
            )
        }
    }
}

/// Bars at the requested granularity plus everything derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub code: InstrumentCode,
    pub granularity: Granularity,
    pub start: MarketDate,
    pub bars: Vec<PriceBar>,
    pub derived: DerivedSeries,
    /// Last bar against the one before it, at the requested granularity.
    pub day_change: DayChange,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialsView {
    pub code: InstrumentCode,
    pub table: FinancialStatementTable,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisclosuresView {
    pub code: InstrumentCode,
    pub entries: Vec<DisclosureEntry>,
    pub status: SectionStatus,
}

/// Full dashboard for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub instrument: Instrument,
    pub resolved_by: ResolvedBy,
    pub chart: ChartView,
    pub financials: FinancialsView,
    pub disclosures: DisclosuresView,
    #[serde(skip)]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub source_chain: Vec<ProviderId>,
    #[serde(skip)]
    pub cache_hit: bool,
}

impl DashboardReport {
    pub fn sections(&self) -> [(&'static str, &SectionStatus); 3] {
        [
            ("prices", &self.chart.status),
            ("financials", &self.financials.status),
            ("disclosures", &self.disclosures.status),
        ]
    }

    pub fn has_failures(&self) -> bool {
        self.sections().iter().any(|(_, status)| status.is_failed())
    }
}

/// Pipeline entry point holding the connectors, listing cache and constants.
#[derive(Clone)]
pub struct Dashboard {
    directory: InstrumentDirectory,
    market: Arc<dyn DataSource>,
    flow_model: Arc<dyn FlowModel>,
    cache_mode: CacheMode,
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(
        listing: Arc<dyn DataSource>,
        market: Arc<dyn DataSource>,
        config: DashboardConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let directory = InstrumentDirectory::new(
            listing,
            ListingCache::new(config.listing.ttl()),
            config.default_code()?,
        );
        Ok(Self {
            directory,
            market,
            flow_model: Arc::new(PriceMomentumFlow::from_config(&config.indicators)),
            cache_mode: CacheMode::Use,
            config,
        })
    }

    /// Exchange listing and portal connectors over one transport.
    pub fn from_http_client(
        http_client: Arc<dyn HttpClient>,
        config: DashboardConfig,
    ) -> Result<Self, CoreError> {
        let listing = Arc::new(KrxAdapter::new(http_client.clone(), config.sources.clone()));
        let market = Arc::new(NaverAdapter::new(http_client, config.sources.clone()));
        Self::new(listing, market, config)
    }

    pub fn with_flow_model(mut self, flow_model: Arc<dyn FlowModel>) -> Self {
        self.flow_model = flow_model;
        self
    }

    /// Swap the in-memory listing cache, e.g. for a persistent one.
    pub fn with_listing_cache(mut self, cache: ListingCache) -> Self {
        self.directory = self.directory.with_cache(cache);
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn directory(&self) -> &InstrumentDirectory {
        &self.directory
    }

    pub fn market_source(&self) -> ProviderId {
        self.market.id()
    }

    pub async fn search(&self, query: &str, limit: usize) -> ListingLookup {
        self.directory.search(query, limit, self.cache_mode).await
    }

    pub async fn resolve(&self, selection: &InstrumentSelection) -> Resolution {
        self.directory.resolve(selection, self.cache_mode).await
    }

    pub async fn chart(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        start: MarketDate,
    ) -> ChartView {
        let outcome = match PriceHistoryRequest::new(code.clone(), start) {
            Ok(request) => self.market.price_history(request).await,
            Err(error) => Err(error),
        };
        let (native, status) = settle("prices", outcome.map(|fetched| fetched.map(|s| s.bars)));

        let native = PriceSeries::new(code.clone(), Granularity::Daily, native);
        let series = resample(&native, granularity);
        let derived = DerivedSeries::compute(
            &series.bars,
            self.flow_model.as_ref(),
            &self.config.indicators.moving_average_windows,
        );
        let day_change = day_change(&series.bars);

        ChartView {
            code: code.clone(),
            granularity,
            start,
            bars: series.bars,
            derived,
            day_change,
            status,
        }
    }

    pub async fn financials(&self, code: &InstrumentCode) -> FinancialsView {
        let (table, status) = settle("financials", self.market.statements(code).await);
        FinancialsView {
            code: code.clone(),
            table,
            status,
        }
    }

    pub async fn disclosures(&self, code: &InstrumentCode, limit: usize) -> DisclosuresView {
        let (mut entries, status) = settle("disclosures", self.market.disclosures(code).await);
        entries.truncate(limit);
        DisclosuresView {
            code: code.clone(),
            entries,
            status,
        }
    }

    /// Resolve the instrument, then fetch every section in turn.
    pub async fn report(
        &self,
        selection: &InstrumentSelection,
        granularity: Granularity,
        start: MarketDate,
    ) -> DashboardReport {
        let resolution = self.resolve(selection).await;
        let code = resolution.instrument.code.clone();
        info!(%code, %granularity, %start, "assembling dashboard");

        let chart = self.chart(&code, granularity, start).await;
        let financials = self.financials(&code).await;
        let disclosures = self
            .disclosures(&code, self.config.report.disclosure_limit)
            .await;

        let mut warnings = resolution.warnings;
        for (section, status) in [
            ("prices", &chart.status),
            ("financials", &financials.status),
            ("disclosures", &disclosures.status),
        ] {
            warnings.extend(status.warning(section));
        }

        let mut source_chain: Vec<ProviderId> = resolution.source.into_iter().collect();
        if !source_chain.contains(&self.market.id()) {
            source_chain.push(self.market.id());
        }

        DashboardReport {
            instrument: resolution.instrument,
            resolved_by: resolution.resolved_by,
            chart,
            financials,
            disclosures,
            warnings,
            source_chain,
            cache_hit: resolution.cache_hit,
        }
    }
}
