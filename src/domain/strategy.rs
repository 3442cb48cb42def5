//! Strategy parameters for the RSI / moving-average / trailing-stop strategy.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::{stddev_mult_x100, IndicatorType};
use crate::domain::indicator_helpers::ma_window;

/// How an entry order is placed once a signal fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEntry {
    /// Fill at the bar open, pay the taker fee.
    Market,
    /// Rest a buy at the prior close, pay the maker fee when filled.
    Limit,
}

impl OrderEntry {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEntry::Market => "market",
            OrderEntry::Limit => "limit",
        }
    }
}

impl fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "market" => Ok(OrderEntry::Market),
            "limit" => Ok(OrderEntry::Limit),
            other => Err(format!("unknown order entry '{other}' (expected market or limit)")),
        }
    }
}

/// Which Bollinger band interaction counts as an entry trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BbRule {
    TouchLower,
    CrossUpFromBelow,
    BelowLower,
}

impl BbRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BbRule::TouchLower => "touch_lower",
            BbRule::CrossUpFromBelow => "cross_up_from_below",
            BbRule::BelowLower => "below_lower",
        }
    }
}

impl fmt::Display for BbRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BbRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "touch_lower" => Ok(BbRule::TouchLower),
            "cross_up_from_below" => Ok(BbRule::CrossUpFromBelow),
            "below_lower" => Ok(BbRule::BelowLower),
            other => Err(format!(
                "unknown bollinger rule '{other}' (expected touch_lower, cross_up_from_below or below_lower)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerParams {
    pub window: usize,
    pub num_std: f64,
    pub rule: BbRule,
}

impl BollingerParams {
    pub fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.window,
            stddev_mult_x100: stddev_mult_x100(self.num_std),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub rsi_period: usize,
    pub rsi_threshold: f64,
    /// Fraction below the running peak that triggers the exit (0.02 = 2%).
    pub trailing_stop_pct: f64,
    /// Moving-average lengths in days. Empty means no MA filter.
    pub ma_days: Vec<usize>,
    pub order_entry: OrderEntry,
    pub use_rsi: bool,
    pub use_ma: bool,
    pub bollinger: Option<BollingerParams>,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            rsi_period: 14,
            rsi_threshold: 30.0,
            trailing_stop_pct: 0.02,
            ma_days: Vec::new(),
            order_entry: OrderEntry::Market,
            use_rsi: true,
            use_ma: true,
            bollinger: None,
        }
    }
}

impl Strategy {
    /// True when entries are scaled by moving-average passes.
    pub fn ma_filter_active(&self) -> bool {
        self.use_ma && !self.ma_days.is_empty()
    }

    pub fn rsi_indicator(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_period)
    }

    pub fn ma_indicators(&self, bars_per_day: usize) -> Vec<IndicatorType> {
        self.ma_days
            .iter()
            .map(|&days| IndicatorType::Sma(ma_window(days, bars_per_day)))
            .collect()
    }

    /// Every indicator the signal stage reads.
    pub fn required_indicators(&self, bars_per_day: usize) -> Vec<IndicatorType> {
        let mut out = Vec::new();
        if self.use_rsi {
            out.push(self.rsi_indicator());
        }
        if self.ma_filter_active() {
            out.extend(self.ma_indicators(bars_per_day));
        }
        if let Some(bb) = &self.bollinger {
            out.push(bb.indicator_type());
        }
        out
    }
}
