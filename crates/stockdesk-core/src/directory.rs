//! Instrument lookup over the cached exchange listing.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheMode, CachedListing, ListingCache};
use crate::data_source::{DataSource, Fetched};
use crate::{Instrument, InstrumentCode, ProviderId};

/// Large caps served when the exchange listing cannot be fetched.
const BUILTIN_LISTING: [(&str, &str, &str); 10] = [
    ("005930", "삼성전자", "KOSPI"),
    ("000660", "SK하이닉스", "KOSPI"),
    ("373220", "LG에너지솔루션", "KOSPI"),
    ("207940", "삼성바이오로직스", "KOSPI"),
    ("005380", "현대차", "KOSPI"),
    ("000270", "기아", "KOSPI"),
    ("068270", "셀트리온", "KOSPI"),
    ("035420", "NAVER", "KOSPI"),
    ("035720", "카카오", "KOSPI"),
    ("247540", "에코프로비엠", "KOSDAQ"),
];

pub fn builtin_instruments() -> Vec<Instrument> {
    BUILTIN_LISTING
        .iter()
        .filter_map(|(code, name, market)| {
            let code = InstrumentCode::parse(code).ok()?;
            Some(Instrument::new(code, *name, Some((*market).to_owned())))
        })
        .collect()
}

/// Case-insensitive name substring or code prefix match, listing order kept.
///
/// An empty query matches everything.
pub fn search_instruments(instruments: &[Instrument], query: &str, limit: usize) -> Vec<Instrument> {
    let needle = query.trim().to_lowercase();
    instruments
        .iter()
        .filter(|instrument| {
            needle.is_empty()
                || instrument.name.to_lowercase().contains(&needle)
                || instrument.code.as_str().to_lowercase().starts_with(&needle)
        })
        .take(limit)
        .cloned()
        .collect()
}

/// How the caller picked the instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentSelection {
    /// Manual code entry; no search is performed.
    Code(InstrumentCode),
    Query(String),
    /// Neither given: the configured default.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Manual,
    Search,
    Default,
}

/// Listing served to a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingLookup {
    pub instruments: Vec<Instrument>,
    pub source: ProviderId,
    pub cache_hit: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub instrument: Instrument,
    pub resolved_by: ResolvedBy,
    #[serde(skip)]
    pub source: Option<ProviderId>,
    #[serde(skip)]
    pub cache_hit: bool,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Listing access with caching and a built-in fallback.
#[derive(Clone)]
pub struct InstrumentDirectory {
    source: Arc<dyn DataSource>,
    cache: ListingCache,
    default_code: InstrumentCode,
}

impl InstrumentDirectory {
    pub fn new(source: Arc<dyn DataSource>, cache: ListingCache, default_code: InstrumentCode) -> Self {
        Self {
            source,
            cache,
            default_code,
        }
    }

    pub fn with_cache(mut self, cache: ListingCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    pub fn default_code(&self) -> &InstrumentCode {
        &self.default_code
    }

    /// Full listing. Upstream failures fall back to the built-in list with a
    /// warning; the fallback is never cached.
    pub async fn listing(&self, mode: CacheMode) -> ListingLookup {
        if mode.reads() {
            if let Some(cached) = self.cache.get().await {
                debug!(
                    instruments = cached.instruments.len(),
                    age_secs = cached.age().as_secs(),
                    "listing cache hit"
                );
                return ListingLookup {
                    instruments: cached.instruments,
                    source: cached.source,
                    cache_hit: true,
                    warnings: Vec::new(),
                };
            }
            debug!("listing cache miss");
        }

        let reason = match self.source.listing().await {
            Ok(Fetched::Data(instruments)) => {
                info!(instruments = instruments.len(), source = %self.source.id(), "listing fetched");
                if mode.writes() {
                    self.cache.put(instruments.clone(), self.source.id()).await;
                }
                return ListingLookup {
                    instruments,
                    source: self.source.id(),
                    cache_hit: false,
                    warnings: Vec::new(),
                };
            }
            Ok(Fetched::NoData | Fetched::Empty) => String::from("listing returned no instruments"),
            Err(error) => format!("listing unavailable: {error}"),
        };

        warn!(%reason, "using built-in instrument list");
        ListingLookup {
            instruments: builtin_instruments(),
            source: ProviderId::Builtin,
            cache_hit: false,
            warnings: vec![format!("{reason}; using built-in instrument list")],
        }
    }

    pub async fn search(&self, query: &str, limit: usize, mode: CacheMode) -> ListingLookup {
        let mut lookup = self.listing(mode).await;
        lookup.instruments = search_instruments(&lookup.instruments, query, limit);
        lookup
    }

    /// Pick the instrument for an interaction.
    ///
    /// Manual codes win and never touch the network; the display name is taken
    /// from a cached listing when one is present and `mode` reads the cache. A query uses its first
    /// match, and falls back to the default code with a warning.
    pub async fn resolve(&self, selection: &InstrumentSelection, mode: CacheMode) -> Resolution {
        match selection {
            InstrumentSelection::Code(code) => {
                let cached = self.cached(mode).await;
                let instrument = cached
                    .as_ref()
                    .and_then(|listing| find_by_code(&listing.instruments, code))
                    .unwrap_or_else(|| Instrument::new(code.clone(), code.as_str(), None));
                Resolution {
                    instrument,
                    resolved_by: ResolvedBy::Manual,
                    source: cached.as_ref().map(|listing| listing.source),
                    cache_hit: cached.is_some(),
                    warnings: Vec::new(),
                }
            }
            InstrumentSelection::Query(query) => {
                let lookup = self.listing(mode).await;
                let mut warnings = lookup.warnings;
                let first = search_instruments(&lookup.instruments, query, 1).into_iter().next();
                let (instrument, resolved_by) = match first {
                    Some(instrument) => (instrument, ResolvedBy::Search),
                    None => {
                        warnings.push(format!(
                            "no instrument matches '{}'; using default {}",
                            query.trim(),
                            self.default_code
                        ));
                        (self.default_instrument(&lookup.instruments), ResolvedBy::Default)
                    }
                };
                debug!(code = %instrument.code, ?resolved_by, "instrument resolved");
                Resolution {
                    instrument,
                    resolved_by,
                    source: Some(lookup.source),
                    cache_hit: lookup.cache_hit,
                    warnings,
                }
            }
            InstrumentSelection::Default => {
                let cached = self.cached(mode).await;
                let listing = cached
                    .as_ref()
                    .map(|listing| listing.instruments.clone())
                    .unwrap_or_else(builtin_instruments);
                Resolution {
                    instrument: self.default_instrument(&listing),
                    resolved_by: ResolvedBy::Default,
                    source: cached.as_ref().map(|listing| listing.source),
                    cache_hit: cached.is_some(),
                    warnings: Vec::new(),
                }
            }
        }
    }

    async fn cached(&self, mode: CacheMode) -> Option<CachedListing> {
        if mode.reads() {
            self.cache.get().await
        } else {
            None
        }
    }

    fn default_instrument(&self, listing: &[Instrument]) -> Instrument {
        find_by_code(listing, &self.default_code)
            .or_else(|| find_by_code(&builtin_instruments(), &self.default_code))
            .unwrap_or_else(|| {
                Instrument::new(self.default_code.clone(), self.default_code.as_str(), None)
            })
    }
}

fn find_by_code(instruments: &[Instrument], code: &InstrumentCode) -> Option<Instrument> {
    instruments.iter().find(|i| &i.code == code).cloned()
}
