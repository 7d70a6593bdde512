//! Calendar resampling of native price bars.
//!
//! | Granularity | Bucket | Label |
//! |-------------|--------|-------|
//! | `Daily` | one trading day | the day |
//! | `Weekly` | Monday..Sunday | the Sunday |
//! | `Monthly` | calendar month | last day of month |
//!
//! Aggregation is open=first, high=max, low=min, close=last, volume=sum.
//! Buckets without native rows are not emitted.

use crate::{Granularity, MarketDate, PriceBar, PriceSeries};

/// Sort ascending by date; for repeated dates the later row wins.
pub fn ordered_unique(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|bar| bar.date);
    let mut unique: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match unique.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => unique.push(bar),
        }
    }
    unique
}

/// Reshape a native series to `granularity`.
pub fn resample(series: &PriceSeries, granularity: Granularity) -> PriceSeries {
    let native = ordered_unique(series.bars.clone());
    let bars = match granularity {
        Granularity::Daily => native,
        Granularity::Weekly => aggregate(&native, MarketDate::week_end),
        Granularity::Monthly => aggregate(&native, MarketDate::month_end),
    };
    PriceSeries::new(series.code.clone(), granularity, bars)
}

fn aggregate(native: &[PriceBar], bucket_of: fn(MarketDate) -> MarketDate) -> Vec<PriceBar> {
    let mut buckets: Vec<PriceBar> = Vec::new();
    for bar in native {
        let label = bucket_of(bar.date);
        match buckets.last_mut() {
            Some(open) if open.date == label => {
                open.high = open.high.max(bar.high);
                open.low = open.low.min(bar.low);
                open.close = bar.close;
                open.volume = open.volume.saturating_add(bar.volume);
            }
            _ => buckets.push(PriceBar {
                date: label,
                ..bar.clone()
            }),
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstrumentCode;

    fn bar(date: &str, open: f64, high: f64, low: f64, close: f64, volume: u64) -> PriceBar {
        PriceBar::new(
            MarketDate::parse(date).expect("date"),
            open,
            high,
            low,
            close,
            volume,
        )
        .expect("bar")
    }

    fn series(bars: Vec<PriceBar>) -> PriceSeries {
        PriceSeries::new(
            InstrumentCode::parse("005930").expect("code"),
            Granularity::Daily,
            bars,
        )
    }

    fn sample() -> PriceSeries {
        series(vec![
            // 2024-01-04 is a Thursday, listed out of order on purpose
            bar("2024-01-04", 103.0, 108.0, 101.0, 107.0, 30),
            bar("2024-01-02", 100.0, 105.0, 99.0, 104.0, 10),
            bar("2024-01-03", 104.0, 106.0, 102.0, 103.0, 20),
            bar("2024-01-08", 107.0, 109.0, 95.0, 96.0, 40),
            bar("2024-01-31", 96.0, 97.0, 90.0, 91.0, 50),
            bar("2024-02-01", 91.0, 120.0, 91.0, 119.0, 60),
            // 2024-02-05..2024-02-11 has no rows
            bar("2024-02-13", 119.0, 121.0, 118.0, 120.0, 70),
        ])
    }

    #[test]
    fn weekly_buckets_close_on_sunday() {
        let weekly = resample(&sample(), Granularity::Weekly);
        let labels: Vec<String> = weekly.bars.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(
            labels,
            vec!["2024-01-07", "2024-01-14", "2024-02-04", "2024-02-18"]
        );

        let first = &weekly.bars[0];
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 108.0);
        assert_eq!(first.low, 99.0);
        assert_eq!(first.close, 107.0);
        assert_eq!(first.volume, 60);
        assert_eq!(weekly.granularity, Granularity::Weekly);
    }

    #[test]
    fn monthly_buckets_close_on_month_end() {
        let monthly = resample(&sample(), Granularity::Monthly);
        assert_eq!(monthly.len(), 2);

        let january = &monthly.bars[0];
        assert_eq!(january.date.to_string(), "2024-01-31");
        assert_eq!(january.open, 100.0);
        assert_eq!(january.high, 109.0);
        assert_eq!(january.low, 90.0);
        assert_eq!(january.close, 91.0);
        assert_eq!(january.volume, 150);

        assert_eq!(monthly.bars[1].date.to_string(), "2024-02-29");
        assert_eq!(monthly.bars[1].volume, 130);
    }

    #[test]
    fn native_resampling_is_idempotent() {
        let once = resample(&sample(), Granularity::Daily);
        let twice = resample(&once, Granularity::Daily);
        assert_eq!(once, twice);
        assert!(once.bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn resampled_bars_keep_price_invariants() {
        for granularity in Granularity::ALL {
            for bar in resample(&sample(), granularity).bars {
                assert!(bar.high >= bar.low && bar.low >= 0.0);
                assert!(bar.open >= bar.low && bar.open <= bar.high);
                assert!(bar.close >= bar.low && bar.close <= bar.high);
            }
        }
    }

    #[test]
    fn duplicate_dates_keep_the_later_row() {
        let bars = ordered_unique(vec![
            bar("2024-01-02", 10.0, 11.0, 9.0, 10.0, 1),
            bar("2024-01-02", 10.0, 12.0, 9.0, 12.0, 2),
        ]);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 12.0);
    }

    #[test]
    fn empty_series_stays_empty() {
        for granularity in Granularity::ALL {
            assert!(resample(&series(Vec::new()), granularity).is_empty());
        }
    }
}
