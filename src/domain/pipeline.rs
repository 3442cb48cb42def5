//! End-to-end backtest pipeline shared by single runs and sweeps.

use crate::domain::asset_data::{build_unified_timeline, AssetData};
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::error::RsiTraderError;
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::metrics::{SummaryStats, TradeAnalysis};
use crate::domain::ohlcv::PriceBar;
use crate::domain::performance::{compute_daily_performance, DailyPerformance};
use crate::domain::strategy::Strategy;
use crate::domain::universe::{load_universe, SkippedSymbol, MIN_BARS};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub symbols: Vec<String>,
    pub skipped: Vec<SkippedSymbol>,
    pub bar_count: usize,
    pub timeline_len: usize,
    pub result: BacktestResult,
    pub daily: Vec<DailyPerformance>,
    pub analysis: TradeAnalysis,
    pub stats: SummaryStats,
}

/// Build per-asset bars and indicator series for every loaded symbol.
pub fn prepare_assets(
    loaded: Vec<(String, Vec<PriceBar>)>,
    strategy: &Strategy,
    bars_per_day: usize,
) -> Vec<AssetData> {
    let indicators = strategy.required_indicators(bars_per_day);
    loaded
        .into_iter()
        .map(|(symbol, bars)| {
            let mut asset = AssetData::new(symbol, bars);
            asset.indicators = compute_indicators(&asset.bars, &indicators);
            asset
        })
        .collect()
}

pub fn run_pipeline(
    data_port: &dyn DataPort,
    symbols: &[String],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<PipelineOutput, RsiTraderError> {
    let loaded = load_universe(data_port, symbols, config.start_date, config.end_date, MIN_BARS)?;
    let skipped = loaded.skipped;

    let assets = prepare_assets(loaded.assets, strategy, config.bars_per_day);
    let symbols: Vec<String> = assets.iter().map(|a| a.symbol.clone()).collect();
    let bar_count = assets.iter().map(AssetData::bar_count).sum();
    let timeline = build_unified_timeline(&assets);
    log::info!(
        "running {} over {} symbols, {} timestamps",
        strategy.rsi_indicator(),
        symbols.len(),
        timeline.len()
    );

    let result = run_backtest(&assets, &timeline, strategy, config);
    let daily = compute_daily_performance(&result.portfolio.equity_curve);
    let analysis = TradeAnalysis::compute(
        &result.portfolio.closed_trades,
        &daily,
        config.initial_capital,
    );
    let stats = SummaryStats::compute(&daily, config.use_calendar_days, config.risk_free_rate);

    Ok(PipelineOutput {
        symbols,
        skipped,
        bar_count,
        timeline_len: timeline.len(),
        result,
        daily,
        analysis,
        stats,
    })
}
