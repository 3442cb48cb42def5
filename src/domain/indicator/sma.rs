//! Rolling simple moving average of close.
//!
//! Requires only one observation: until `window` bars are available the value
//! is the mean of the bars seen so far. Uses a running sum, O(n).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], window: usize) -> IndicatorSeries {
    if window == 0 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                timestamp: b.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(window),
            values,
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= window {
            sum -= bars[i - window].close;
        }
        let count = (i + 1).min(window);
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(sum / count as f64),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(window),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                symbol: "TEST".into(),
                timestamp: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn sma_partial_window_uses_available_bars() {
        let series = calculate_sma(&make_bars(&[10.0, 20.0, 30.0, 40.0]), 3);

        assert_relative_eq!(series.simple_at(0).unwrap(), 10.0);
        assert_relative_eq!(series.simple_at(1).unwrap(), 15.0);
        assert_relative_eq!(series.simple_at(2).unwrap(), 20.0);
        assert_relative_eq!(series.simple_at(3).unwrap(), 30.0);
    }

    #[test]
    fn sma_window_one_is_close() {
        let series = calculate_sma(&make_bars(&[5.0, 7.0]), 1);
        assert_relative_eq!(series.simple_at(1).unwrap(), 7.0);
    }

    #[test]
    fn sma_window_larger_than_series() {
        let series = calculate_sma(&make_bars(&[2.0, 4.0, 6.0]), 100);
        assert_relative_eq!(series.simple_at(2).unwrap(), 4.0);
    }

    #[test]
    fn sma_zero_window_invalid() {
        let series = calculate_sma(&make_bars(&[2.0, 4.0]), 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_empty() {
        assert!(calculate_sma(&[], 5).values.is_empty());
    }
}
