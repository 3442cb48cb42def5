//! Open positions and closed trades.

use chrono::NaiveDateTime;

/// A long position in a single asset with a trailing stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    /// Highest high seen since entry, starting at the entry price.
    pub peak_price: f64,
    pub quantity: f64,
    pub allocation_pct: f64,
    pub entry_fee: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price) - self.entry_fee
    }

    pub fn update_peak(&mut self, high: f64) {
        if high > self.peak_price {
            self.peak_price = high;
        }
    }

    pub fn stop_price(&self, trailing_stop_pct: f64) -> f64 {
        self.peak_price * (1.0 - trailing_stop_pct)
    }

    pub fn should_exit(&self, low: f64, trailing_stop_pct: f64) -> bool {
        low <= self.stop_price(trailing_stop_pct)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub quantity: f64,
    pub allocation_pct: f64,
    pub entry_fee: f64,
    pub exit_fee: f64,
    /// Net of both fees.
    pub pnl: f64,
    pub return_pct: f64,
    pub cash_after: f64,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
