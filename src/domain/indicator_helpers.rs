//! Shared helpers for indicator calculations.

use std::collections::HashMap;

use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

/// Bar window for a moving average configured in days.
pub fn ma_window(days: usize, bars_per_day: usize) -> usize {
    days.saturating_mul(bars_per_day.max(1))
}

pub fn compute_indicator(bars: &[PriceBar], indicator: &IndicatorType) -> IndicatorSeries {
    match indicator {
        IndicatorType::Rsi(period) => calculate_rsi(bars, *period),
        IndicatorType::Sma(window) => calculate_sma(bars, *window),
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(bars, *period, *stddev_mult_x100),
    }
}

/// Compute every requested indicator once, keyed by type.
pub fn compute_indicators(
    bars: &[PriceBar],
    indicators: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(indicators.len());
    for indicator in indicators {
        if out.contains_key(indicator) {
            continue;
        }
        out.insert(indicator.clone(), compute_indicator(bars, indicator));
    }
    out
}
