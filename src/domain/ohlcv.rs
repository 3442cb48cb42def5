//! Price bar representation.

use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Calendar day the bar belongs to.
    pub fn trading_day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// True when the bar's prices are internally consistent.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Drop malformed bars, sort by timestamp and drop duplicate timestamps,
/// keeping the first.
pub fn normalize_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    let before = bars.len();
    bars.retain(PriceBar::is_well_formed);
    if bars.len() < before {
        log::warn!("dropped {} malformed bars", before - bars.len());
    }
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}
