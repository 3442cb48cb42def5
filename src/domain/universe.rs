//! Symbol universe for single- and multi-asset backtests.
//!
//! Parses symbol lists from configuration and validates that each symbol has
//! enough data to backtest. Missing or short symbols are skipped with a
//! warning and the run only fails when nothing is left. Malformed data fails
//! the run.

use crate::domain::error::RsiTraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

pub const MIN_BARS: usize = 30;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

/// Symbols that passed validation, with the bars already fetched for them.
pub struct LoadedUniverse {
    pub assets: Vec<(String, Vec<PriceBar>)>,
    pub skipped: Vec<SkippedSymbol>,
}

impl LoadedUniverse {
    pub fn symbols(&self) -> Vec<&str> {
        self.assets.iter().map(|(s, _)| s.as_str()).collect()
    }
}

pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    minimum_bars: usize,
) -> Result<LoadedUniverse, RsiTraderError> {
    let mut assets = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let bars = match data_port.fetch_bars(symbol, start_date, end_date) {
            Ok(bars) => bars,
            Err(e @ RsiTraderError::DataAccess { .. }) => {
                log::warn!("skipping {} ({})", symbol, e);
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if bars.is_empty() {
            log::warn!("skipping {} (no data in {} to {})", symbol, start_date, end_date);
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < minimum_bars {
            log::warn!(
                "skipping {} (only {} bars, minimum {} required)",
                symbol,
                bars.len(),
                minimum_bars
            );
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        log::info!("{}: {} bars [OK]", symbol, bars.len());
        assets.push((symbol.clone(), bars));
    }

    if assets.is_empty() {
        return match skipped.as_slice() {
            [only] => match only.reason {
                SkipReason::NoData => Err(RsiTraderError::NoData {
                    symbol: only.symbol.clone(),
                }),
                SkipReason::InsufficientBars { bars } => Err(RsiTraderError::InsufficientData {
                    symbol: only.symbol.clone(),
                    bars,
                    minimum: minimum_bars,
                }),
            },
            _ => Err(RsiTraderError::NoData {
                symbol: "all".to_string(),
            }),
        };
    }

    if !skipped.is_empty() {
        log::info!(
            "backtesting {} of {} symbols",
            assets.len(),
            assets.len() + skipped.len()
        );
    }

    Ok(LoadedUniverse { assets, skipped })
}
