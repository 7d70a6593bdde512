//! Derived series: period change, flow estimates, moving averages, day change.
//!
//! The two flow series are **not** investor-type trading data. They are
//! price-momentum stand-ins produced by a [`FlowModel`], kept behind that
//! trait so a real data feed can replace them without touching callers.
//! Every [`DerivedSeries`] is marked `synthetic` and carries
//! [`SYNTHETIC_CAVEAT`].

use serde::{Deserialize, Serialize};

use crate::config::IndicatorConfig;
use crate::{MarketDate, PriceBar};

pub const SYNTHETIC_CAVEAT: &str =
    "foreign_flow and institution_flow are estimates derived from price change, not reported trading data";

/// Per-bar flow estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEstimate {
    pub date: MarketDate,
    pub change_pct: f64,
    pub foreign_flow: f64,
    pub institution_flow: Option<f64>,
}

/// Source of the two flow series.
pub trait FlowModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// One estimate per bar, same order as `bars`.
    fn estimate(&self, bars: &[PriceBar]) -> Vec<FlowEstimate>;
}

/// Cumulative period change scaled into flow-like magnitudes.
///
/// `foreign_flow` is the running sum of `change_pct` times `foreign_scale`.
/// `institution_flow` is the running sum of a `institution_window`-period
/// rolling sum of `change_pct`, times `institution_scale`; it is `None`
/// until the first window fills.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMomentumFlow {
    pub foreign_scale: f64,
    pub institution_scale: f64,
    pub institution_window: usize,
}

impl PriceMomentumFlow {
    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self {
            foreign_scale: config.foreign_scale,
            institution_scale: config.institution_scale,
            institution_window: config.institution_window.max(1),
        }
    }
}

impl Default for PriceMomentumFlow {
    fn default() -> Self {
        Self::from_config(&IndicatorConfig::default())
    }
}

impl FlowModel for PriceMomentumFlow {
    fn name(&self) -> &'static str {
        "price_momentum"
    }

    fn estimate(&self, bars: &[PriceBar]) -> Vec<FlowEstimate> {
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let changes = change_pct(&closes);
        let window = self.institution_window.max(1);

        let mut foreign = 0.0;
        let mut institution = 0.0;
        bars.iter()
            .zip(&changes)
            .enumerate()
            .map(|(index, (bar, &change))| {
                foreign += change;
                let institution_flow = (index + 1 >= window).then(|| {
                    institution += changes[index + 1 - window..=index].iter().sum::<f64>();
                    institution * self.institution_scale
                });
                FlowEstimate {
                    date: bar.date,
                    change_pct: change,
                    foreign_flow: foreign * self.foreign_scale,
                    institution_flow,
                }
            })
            .collect()
    }
}

/// Period-over-period change as a fraction; the first period is 0, as is any
/// period following a zero close.
pub fn change_pct(closes: &[f64]) -> Vec<f64> {
    let mut changes = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return changes;
    }
    changes.push(0.0);
    changes.extend(closes.windows(2).map(|pair| {
        if pair[0] == 0.0 {
            0.0
        } else {
            pair[1] / pair[0] - 1.0
        }
    }));
    changes
}

/// Simple moving average of close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

/// Trailing mean over `window` values; `None` until the window is full.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut averages = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (index, value) in values.iter().enumerate() {
        sum += value;
        if index >= window {
            sum -= values[index - window];
        }
        averages.push((index + 1 >= window).then(|| sum / window as f64));
    }
    averages
}

pub fn moving_averages(closes: &[f64], windows: &[usize]) -> Vec<MovingAverage> {
    windows
        .iter()
        .map(|&window| MovingAverage {
            window,
            values: moving_average(closes, window),
        })
        .collect()
}

/// Latest close against the one before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayChange {
    Available {
        date: MarketDate,
        current: f64,
        previous: f64,
        change: f64,
        /// Fraction, e.g. `0.012` for +1.2%.
        change_pct: f64,
    },
    /// Fewer than two bars.
    Insufficient { available: usize },
}

pub fn day_change(bars: &[PriceBar]) -> DayChange {
    let [.., previous, current] = bars else {
        return DayChange::Insufficient {
            available: bars.len(),
        };
    };

    let change = current.close - previous.close;
    let change_pct = if previous.close == 0.0 {
        0.0
    } else {
        change / previous.close
    };
    DayChange::Available {
        date: current.date,
        current: current.close,
        previous: previous.close,
        change,
        change_pct,
    }
}

/// Bar direction used for volume colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeDirection {
    Up,
    Down,
}

impl VolumeDirection {
    pub fn of(bar: &PriceBar) -> Self {
        if bar.is_up() {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Everything derived from one bar series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    pub synthetic: bool,
    pub caveat: String,
    pub model: String,
    pub flows: Vec<FlowEstimate>,
    pub moving_averages: Vec<MovingAverage>,
    pub volume_direction: Vec<VolumeDirection>,
}

impl DerivedSeries {
    pub fn compute(bars: &[PriceBar], model: &dyn FlowModel, ma_windows: &[usize]) -> Self {
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        Self {
            synthetic: true,
            caveat: SYNTHETIC_CAVEAT.to_owned(),
            model: model.name().to_owned(),
            flows: model.estimate(bars),
            moving_averages: moving_averages(&closes, ma_windows),
            volume_direction: bars.iter().map(VolumeDirection::of).collect(),
        }
    }

    pub fn moving_average(&self, window: usize) -> Option<&MovingAverage> {
        self.moving_averages.iter().find(|ma| ma.window == window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(day, &close)| {
                let date = MarketDate::from_ymd(2024, 1, u8::try_from(day + 2).expect("day"))
                    .expect("date");
                PriceBar::new(date, close, close, close, close, 1_000).expect("bar")
            })
            .collect()
    }

    #[test]
    fn three_bar_scenario() {
        let flows = PriceMomentumFlow::default().estimate(&bars(&[105.0, 103.0, 110.0]));

        let changes: Vec<f64> = flows.iter().map(|f| f.change_pct).collect();
        assert_eq!(changes[0], 0.0);
        assert!((changes[1] - (103.0 / 105.0 - 1.0)).abs() < EPS);
        assert!((changes[2] - (110.0 / 103.0 - 1.0)).abs() < EPS);
        assert!((changes[1] + 0.019).abs() < 1e-3);
        assert!((changes[2] - 0.068).abs() < 1e-3);

        assert_eq!(flows[0].foreign_flow, 0.0);
        assert!((flows[1].foreign_flow - changes[1] * 1_000_000.0).abs() < 1e-6);
        assert!((flows[2].foreign_flow - (changes[1] + changes[2]) * 1_000_000.0).abs() < 1e-6);
        assert!((flows[2].foreign_flow - 48_913.0).abs() < 1.0);

        assert!(flows.iter().all(|f| f.institution_flow.is_none()));
    }

    #[test]
    fn institution_flow_starts_when_window_fills() {
        let model = PriceMomentumFlow {
            foreign_scale: 1.0,
            institution_scale: 1.0,
            institution_window: 2,
        };
        let flows = model.estimate(&bars(&[100.0, 110.0, 99.0, 99.0]));
        let changes = change_pct(&[100.0, 110.0, 99.0, 99.0]);

        assert_eq!(flows[0].institution_flow, None);
        let r1 = changes[0] + changes[1];
        let r2 = changes[1] + changes[2];
        let r3 = changes[2] + changes[3];
        let expected = [r1, r1 + r2, r1 + r2 + r3];
        for (flow, want) in flows[1..].iter().zip(expected) {
            assert!((flow.institution_flow.expect("defined") - want).abs() < EPS);
        }
    }

    #[test]
    fn zero_previous_close_yields_zero_change() {
        assert_eq!(change_pct(&[0.0, 5.0, 10.0]), vec![0.0, 0.0, 1.0]);
        assert!(change_pct(&[]).is_empty());
    }

    #[test]
    fn moving_average_waits_for_full_window() {
        let values = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert!(moving_average(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn day_change_needs_two_bars() {
        assert_eq!(day_change(&[]), DayChange::Insufficient { available: 0 });
        assert_eq!(
            day_change(&bars(&[100.0])),
            DayChange::Insufficient { available: 1 }
        );

        let DayChange::Available {
            current,
            previous,
            change,
            change_pct,
            ..
        } = day_change(&bars(&[90.0, 100.0, 102.0]))
        else {
            panic!("expected available change");
        };
        assert_eq!(current, 102.0);
        assert_eq!(previous, 100.0);
        assert_eq!(change, 2.0);
        assert!((change_pct - 0.02).abs() < EPS);
    }

    #[test]
    fn derived_series_is_deterministic_and_flagged() {
        let input = bars(&[100.0, 101.0, 99.5, 102.0, 103.0, 101.0]);
        let model = PriceMomentumFlow::default();
        let first = DerivedSeries::compute(&input, &model, &[5, 20, 60]);
        let second = DerivedSeries::compute(&input, &model, &[5, 20, 60]);

        assert_eq!(first, second);
        assert!(first.synthetic);
        assert_eq!(first.caveat, SYNTHETIC_CAVEAT);
        assert_eq!(first.flows.len(), input.len());
        assert_eq!(first.volume_direction.len(), input.len());
        assert_eq!(
            first.moving_average(5).map(|ma| ma.values.iter().flatten().count()),
            Some(2)
        );
        assert!(first
            .moving_average(60)
            .is_some_and(|ma| ma.values.iter().all(Option::is_none)));
    }

    #[test]
    fn day_change_serializes_with_status_tag() {
        let json = serde_json::to_value(DayChange::Insufficient { available: 1 }).expect("json");
        assert_eq!(json["status"], "insufficient");
        assert_eq!(json["available"], 1);
    }
}
