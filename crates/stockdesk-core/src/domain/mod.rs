//! # Domain Models
//!
//! Canonical domain types for stockdesk.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Instrument`] | Listing entry (code, display name, market) |
//! | [`PriceBar`] | OHLCV bar for one period |
//! | [`PriceSeries`] | Ordered bars for an instrument/granularity |
//! | [`FinancialStatementTable`] | Sparse line-item x period grid |
//! | [`DisclosureEntry`] | Headline with keyword category |
//! | [`InstrumentCode`] | Validated exchange code |
//! | [`Granularity`] | Daily, weekly or monthly buckets |
//! | [`MarketDate`] | Calendar date |
//!
//! All types enforce invariants at construction time:
//!
//! ```rust
//! use stockdesk_core::{MarketDate, PriceBar, ValidationError};
//!
//! let date = MarketDate::parse("2024-01-02").unwrap();
//! assert!(PriceBar::new(date, 100.0, 105.0, 95.0, 102.0, 1_000).is_ok());
//!
//! // high < low
//! let invalid = PriceBar::new(date, 100.0, 95.0, 105.0, 102.0, 1_000);
//! assert!(matches!(invalid, Err(ValidationError::InvalidBarRange)));
//! ```

mod code;
mod date;
mod granularity;
mod models;

pub use code::InstrumentCode;
pub use date::MarketDate;
pub use granularity::Granularity;
pub use models::{
    DisclosureCategory, DisclosureEntry, FinancialStatementTable, Instrument, PriceBar,
    PriceSeries, StatementRow,
};
