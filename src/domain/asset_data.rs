//! Per-asset bars + indicators, and the unified multi-asset timeline.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct AssetData {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
    pub time_index: HashMap<NaiveDateTime, usize>,
}

impl AssetData {
    pub fn new(symbol: String, bars: Vec<PriceBar>) -> Self {
        let time_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.timestamp, i))
            .collect();
        Self {
            symbol,
            bars,
            indicators: HashMap::new(),
            time_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, timestamp: NaiveDateTime) -> Option<&PriceBar> {
        self.time_index.get(&timestamp).map(|&i| &self.bars[i])
    }

    pub fn get_bar_index(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.time_index.get(&timestamp).copied()
    }

    pub fn indicator(&self, indicator: &IndicatorType) -> Option<&IndicatorSeries> {
        self.indicators.get(indicator)
    }
}

pub fn build_unified_timeline(assets: &[AssetData]) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = assets
        .iter()
        .flat_map(|a| a.bars.iter().map(|bar| bar.timestamp))
        .collect();
    unique.into_iter().collect()
}
