use serde::{Deserialize, Serialize};

use crate::{Granularity, InstrumentCode, MarketDate, ValidationError};

/// Canonical instrument reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub code: InstrumentCode,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
}

impl Instrument {
    pub fn new(code: InstrumentCode, name: impl Into<String>, market: Option<String>) -> Self {
        Self {
            code,
            name: name.into(),
            market,
        }
    }

    /// `Name (code)` label used by selection lists.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

/// OHLCV bar for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: MarketDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(
        date: MarketDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Whether the period closed at or above its open; drives volume colouring.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Ordered bars for one instrument at one granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub code: InstrumentCode,
    pub granularity: Granularity,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(code: InstrumentCode, granularity: Granularity, bars: Vec<PriceBar>) -> Self {
        Self {
            code,
            granularity,
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }
}

/// One line item of a financial statement table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// Sparse line-item x period grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatementTable {
    pub columns: Vec<String>,
    pub rows: Vec<StatementRow>,
}

impl FinancialStatementTable {
    pub fn new(columns: Vec<String>, rows: Vec<StatementRow>) -> Result<Self, ValidationError> {
        for row in &rows {
            if row.values.len() != columns.len() {
                return Err(ValidationError::StatementShape {
                    label: row.label.clone(),
                    expected: columns.len(),
                    actual: row.values.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell lookup by line-item label and period column.
    pub fn value(&self, label: &str, column: &str) -> Option<f64> {
        let column_index = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|row| row.label == label)
            .and_then(|row| row.values.get(column_index).copied().flatten())
    }
}

/// Keyword-derived disclosure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureCategory {
    /// Supply contracts and order wins.
    Order,
    Dividend,
    General,
}

impl DisclosureCategory {
    const ORDER_KEYWORDS: [&'static str; 3] = ["수주", "공급계약", "판매ㆍ공급"];
    const DIVIDEND_KEYWORDS: [&'static str; 2] = ["배당", "dividend"];

    pub fn classify(headline: &str) -> Self {
        let lowered = headline.to_lowercase();
        if Self::ORDER_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            Self::Order
        } else if Self::DIVIDEND_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            Self::Dividend
        } else {
            Self::General
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::Order => "📦",
            Self::Dividend => "💰",
            Self::General => "📢",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Dividend => "dividend",
            Self::General => "general",
        }
    }
}

/// Disclosure headline with its derived category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureEntry {
    pub headline: String,
    pub date: Option<MarketDate>,
    pub category: DisclosureCategory,
}

impl DisclosureEntry {
    pub fn new(headline: impl Into<String>, date: Option<MarketDate>) -> Self {
        let headline = headline.into();
        let category = DisclosureCategory::classify(&headline);
        Self {
            headline,
            date,
            category,
        }
    }

    pub fn icon(&self) -> &'static str {
        self.category.icon()
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
