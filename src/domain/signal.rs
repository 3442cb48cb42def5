//! Entry signal evaluation.
//!
//! Signals are computed per bar ahead of the simulation so the backtest loop
//! only reads flags. RSI is read from the prior bar; MA passes and Bollinger
//! triggers read the current bar.

use chrono::NaiveDateTime;

use crate::domain::asset_data::AssetData;
use crate::domain::strategy::{BbRule, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub rsi_trigger: bool,
    pub ma_passes: usize,
    pub ma_total: usize,
    pub bb_trigger: bool,
    /// Fraction of cash to commit when entering on this bar.
    pub allocation_pct: f64,
    pub entry: bool,
}

pub fn create_signals(asset: &AssetData, strategy: &Strategy, bars_per_day: usize) -> Vec<Signal> {
    let rsi = strategy
        .use_rsi
        .then(|| asset.indicator(&strategy.rsi_indicator()))
        .flatten();
    let mas: Vec<_> = if strategy.ma_filter_active() {
        strategy
            .ma_indicators(bars_per_day)
            .iter()
            .map(|t| asset.indicator(t))
            .collect()
    } else {
        Vec::new()
    };
    let bands = strategy
        .bollinger
        .as_ref()
        .map(|bb| (bb.rule, asset.indicator(&bb.indicator_type())));

    asset
        .bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let rsi_trigger = if strategy.use_rsi {
                i > 0
                    && rsi
                        .and_then(|s| s.simple_at(i - 1))
                        .is_some_and(|prev| prev < strategy.rsi_threshold)
            } else {
                true
            };

            let ma_total = mas.len();
            let ma_passes = mas
                .iter()
                .filter(|s| s.and_then(|s| s.simple_at(i)).is_some_and(|ma| bar.close > ma))
                .count();
            let allocation_pct = if ma_total > 0 {
                ma_passes as f64 / ma_total as f64
            } else {
                1.0
            };

            let bb_trigger = match bands {
                None => true,
                Some((rule, series)) => series.is_some_and(|s| {
                    let Some((_, _, lower)) = s.bands_at(i) else {
                        return false;
                    };
                    match rule {
                        BbRule::TouchLower => bar.low <= lower,
                        BbRule::BelowLower => bar.close < lower,
                        BbRule::CrossUpFromBelow => {
                            i > 0
                                && s.bands_at(i - 1).is_some_and(|(_, _, prev_lower)| {
                                    asset.bars[i - 1].close < prev_lower
                                })
                                && bar.close >= lower
                        }
                    }
                }),
            };

            Signal {
                timestamp: bar.timestamp,
                rsi_trigger,
                ma_passes,
                ma_total,
                bb_trigger,
                allocation_pct,
                entry: rsi_trigger && bb_trigger && allocation_pct > 0.0,
            }
        })
        .collect()
}
