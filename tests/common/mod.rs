#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rsitrader::domain::backtest::BacktestConfig;
use rsitrader::domain::error::RsiTraderError;
use rsitrader::domain::execution::FeeSchedule;
pub use rsitrader::domain::ohlcv::PriceBar;
use rsitrader::domain::strategy::Strategy;
use rsitrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RsiTraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RsiTraderError::DataAccess {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.trading_day() >= start_date && b.trading_day() <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RsiTraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RsiTraderError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.timestamp).min().unwrap();
                let max = bars.iter().map(|b| b.timestamp).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Midnight of `start + day` days.
pub fn day(day: usize) -> NaiveDateTime {
    (date(2024, 1, 1) + chrono::Duration::days(day as i64))
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(symbol: &str, day_index: usize, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        timestamp: day(day_index),
        open,
        high,
        low,
        close,
        volume: 1.0,
    }
}

pub fn flat_bar(symbol: &str, day_index: usize, price: f64) -> PriceBar {
    make_bar(symbol, day_index, price, price, price, price)
}

/// Forty daily bars producing exactly one trade under [`rsi_strategy`]:
/// a one-bar dip pushes RSI to zero, the next bar enters at 100, price climbs
/// to 114, and bar 10 breaks the 10% trailing stop at 102.6.
pub fn single_trade_bars(symbol: &str) -> Vec<PriceBar> {
    let mut bars = vec![flat_bar(symbol, 0, 100.0), flat_bar(symbol, 1, 99.0)];
    for i in 2..=9 {
        bars.push(flat_bar(symbol, i, 100.0 + 2.0 * (i - 2) as f64));
    }
    bars.push(make_bar(symbol, 10, 112.0, 112.0, 100.0, 101.0));
    for i in 11..40 {
        bars.push(flat_bar(symbol, i, 101.0));
    }
    bars
}

/// Slowly rising bars that never trigger an RSI entry.
pub fn rising_bars(symbol: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    (0..count)
        .map(|i| flat_bar(symbol, i, start_price + i as f64))
        .collect()
}

pub fn rsi_strategy() -> Strategy {
    Strategy {
        trailing_stop_pct: 0.10,
        ..Strategy::default()
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        initial_capital: 1_000.0,
        fees: FeeSchedule::default(),
        trading_fees: false,
        bars_per_day: 1,
        use_calendar_days: true,
        risk_free_rate: 0.0,
    }
}
