//! Backtest engine and event loop.
//!
//! Walks the unified timeline with one shared cash balance. At each timestamp
//! every asset with a bar is visited in configured order: a flat asset may
//! enter on its signal, a held asset trails its peak and exits when the stop
//! is breached. One equity point is recorded per timestamp.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use super::asset_data::AssetData;
use super::execution::{self, EntryResult, FeeSchedule};
use super::portfolio::Portfolio;
use super::signal::{create_signals, Signal};
use super::strategy::Strategy;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub fees: FeeSchedule,
    /// When false every fill is free regardless of `fees`.
    pub trading_fees: bool,
    pub bars_per_day: usize,
    pub use_calendar_days: bool,
    pub risk_free_rate: f64,
}

impl BacktestConfig {
    pub fn effective_fees(&self) -> FeeSchedule {
        if self.trading_fees {
            self.fees
        } else {
            FeeSchedule::disabled()
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    /// Per-asset signals, in the order the assets were supplied.
    pub signals: Vec<(String, Vec<Signal>)>,
    /// Latest close seen per symbol; used to value open positions.
    pub last_prices: HashMap<String, f64>,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.portfolio.initial_capital)
    }
}

pub fn run_backtest(
    assets: &[AssetData],
    timeline: &[NaiveDateTime],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> BacktestResult {
    let fees = config.effective_fees();
    let entry_rate = fees.entry_rate(strategy.order_entry);
    let exit_rate = fees.exit_rate();

    let signals: Vec<Vec<Signal>> = assets
        .iter()
        .map(|asset| create_signals(asset, strategy, config.bars_per_day))
        .collect();

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut last_prices: HashMap<String, f64> = HashMap::new();

    for &timestamp in timeline {
        for (asset, asset_signals) in assets.iter().zip(&signals) {
            let Some(idx) = asset.get_bar_index(timestamp) else {
                continue;
            };
            let bar = &asset.bars[idx];
            last_prices.insert(asset.symbol.clone(), bar.close);

            if let Some(position) = portfolio.get_position_mut(&asset.symbol) {
                let prior_stop = position.stop_price(strategy.trailing_stop_pct);
                position.update_peak(bar.high);
                let Some(exit_price) =
                    execution::exit_fill_price(position, bar, strategy.trailing_stop_pct, prior_stop)
                else {
                    continue;
                };
                if let Some(exit) =
                    execution::exit_position(&mut portfolio, &asset.symbol, exit_price, timestamp, exit_rate)
                {
                    log::debug!(
                        "{} exit {} @ {:.4} pnl {:.2}",
                        timestamp,
                        asset.symbol,
                        exit.exit_price,
                        exit.pnl
                    );
                }
                continue;
            }

            let signal = &asset_signals[idx];
            if !signal.entry {
                continue;
            }
            let prev_close = idx.checked_sub(1).map(|p| asset.bars[p].close);
            let Some(fill) = execution::entry_fill_price(bar, prev_close, strategy.order_entry) else {
                continue;
            };
            if let EntryResult::Entered { quantity, .. } = execution::enter_long(
                &mut portfolio,
                &asset.symbol,
                fill,
                timestamp,
                signal.allocation_pct,
                entry_rate,
            ) {
                log::debug!(
                    "{} entry {} @ {:.4} qty {:.6} alloc {:.2}",
                    timestamp,
                    asset.symbol,
                    fill,
                    quantity,
                    signal.allocation_pct
                );
            }
        }

        let equity = portfolio.total_equity(&last_prices);
        portfolio.record_equity(timestamp, equity);
    }

    BacktestResult {
        portfolio,
        signals: assets
            .iter()
            .map(|a| a.symbol.clone())
            .zip(signals)
            .collect(),
        last_prices,
    }
}
