//! CSV report adapter implementing ReportPort.
//!
//! One run produces `trades.csv`, `open_positions.csv`, `signals.csv`,
//! `daily_performance.csv` and `summary.csv` in its artifact directory.
//! Sweep rows are appended to a single results file.

use std::fs::{self, OpenOptions};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::RsiTraderError;
use crate::domain::metrics::{SummaryStats, TradeAnalysis};
use crate::domain::pipeline::PipelineOutput;
use crate::domain::strategy::Strategy;
use crate::domain::sweep::SweepOutcome;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct TradeRow<'a> {
    symbol: &'a str,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    quantity: f64,
    allocation_pct: f64,
    entry_fee: f64,
    exit_fee: f64,
    pnl: f64,
    return_pct: f64,
    cash_after: f64,
    cumulative_pnl: f64,
    equity: f64,
    cumulative_return: f64,
}

#[derive(Serialize)]
struct OpenPositionRow<'a> {
    symbol: &'a str,
    entry_time: String,
    entry_price: f64,
    peak_price: f64,
    quantity: f64,
    allocation_pct: f64,
    entry_fee: f64,
    last_price: f64,
    market_value: f64,
    unrealized_pnl: f64,
}

#[derive(Serialize)]
struct SignalRow<'a> {
    symbol: &'a str,
    timestamp: String,
    rsi_trigger: bool,
    ma_passes: usize,
    ma_total: usize,
    bb_trigger: bool,
    allocation_pct: f64,
    entry: bool,
}

#[derive(Serialize)]
struct DailyRow {
    date: String,
    cash: f64,
    equity: f64,
    daily_return: f64,
    cumulative_return: f64,
    drawdown: f64,
}

#[derive(Serialize)]
struct SummaryRow {
    metric: &'static str,
    value: String,
}

#[derive(Serialize)]
struct SweepRow {
    #[serde(rename = "TICKERS")]
    tickers: String,
    #[serde(rename = "MA_DAYS")]
    ma_days: String,
    #[serde(rename = "INITIAL_CAPITAL")]
    initial_capital: f64,
    #[serde(rename = "RSI_PERIOD")]
    rsi_period: usize,
    #[serde(rename = "RSI_THRESHOLD")]
    rsi_threshold: f64,
    #[serde(rename = "TRAILING_STOP_PCT")]
    trailing_stop_pct: f64,
    #[serde(rename = "START_DATE")]
    start_date: String,
    #[serde(rename = "END_DATE")]
    end_date: String,
    #[serde(rename = "Total Trades")]
    total_trades: Option<usize>,
    #[serde(rename = "Win Rate")]
    win_rate: Option<f64>,
    #[serde(rename = "Total Return")]
    total_return: Option<f64>,
    #[serde(rename = "Average Return Per Trade")]
    average_return_per_trade: Option<f64>,
    #[serde(rename = "Max Trade Gain (%)")]
    max_trade_gain_pct: Option<f64>,
    #[serde(rename = "Max Trade Loss (%)")]
    max_trade_loss_pct: Option<f64>,
    #[serde(rename = "Total PnL")]
    total_pnl: Option<f64>,
    #[serde(rename = "Average PnL Per Trade")]
    average_pnl_per_trade: Option<f64>,
    #[serde(rename = "Max Trade Gain ($)")]
    max_trade_gain_pnl: Option<f64>,
    #[serde(rename = "Max Trade Loss ($)")]
    max_trade_loss_pnl: Option<f64>,
    #[serde(rename = "Annualized Mean Return")]
    annualized_mean: Option<f64>,
    #[serde(rename = "Annualized Volatility")]
    annualized_volatility: Option<f64>,
    #[serde(rename = "Annualized Sharpe Ratio")]
    sharpe_ratio: Option<f64>,
    #[serde(rename = "CAGR")]
    cagr: Option<f64>,
    #[serde(rename = "Daily Max Return")]
    daily_max_return: Option<f64>,
    #[serde(rename = "Daily Max Return Date")]
    daily_max_return_date: Option<String>,
    #[serde(rename = "Daily Min Return")]
    daily_min_return: Option<f64>,
    #[serde(rename = "Daily Min Return Date")]
    daily_min_return_date: Option<String>,
    #[serde(rename = "Max Drawdown")]
    max_drawdown: Option<f64>,
    #[serde(rename = "Peak")]
    peak_date: Option<String>,
    #[serde(rename = "Trough")]
    trough_date: Option<String>,
    #[serde(rename = "Recovery Date")]
    recovery_date: Option<String>,
    #[serde(rename = "Days to Recover")]
    days_to_recover: Option<i64>,
    #[serde(rename = "MAR Ratio")]
    mar_ratio: Option<f64>,
    #[serde(rename = "Total Runtime (s)")]
    total_runtime: f64,
    #[serde(rename = "Average Runtime (s)")]
    average_runtime: f64,
    #[serde(rename = "Runtime (s)")]
    runtime: f64,
    #[serde(rename = "Runtime EMA (s)")]
    ema_runtime: f64,
    #[serde(rename = "Success-only Runtime EMA (s)")]
    success_ema_runtime: Option<f64>,
    #[serde(rename = "Success")]
    success: bool,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "Order Entry")]
    order_entry: &'static str,
    #[serde(rename = "BB Rule")]
    bb_rule: Option<&'static str>,
    #[serde(rename = "BB Window")]
    bb_window: Option<usize>,
    #[serde(rename = "BB Num Std")]
    bb_num_std: Option<f64>,
    #[serde(rename = "Trade Taker Fee")]
    taker_fee: f64,
    #[serde(rename = "Trade Maker Fee")]
    maker_fee: f64,
}

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn fmt_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> RsiTraderError {
    RsiTraderError::ReportWrite {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Serialize every row into a fresh file at `path`.
fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), RsiTraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

fn write_trades(path: &Path, output: &PipelineOutput, initial_capital: f64) -> Result<(), RsiTraderError> {
    let mut cumulative_pnl = 0.0;
    let rows = output.result.portfolio.closed_trades.iter().map(|t| {
        cumulative_pnl += t.pnl;
        let equity = initial_capital + cumulative_pnl;
        TradeRow {
            symbol: &t.symbol,
            entry_time: fmt_ts(t.entry_time),
            entry_price: t.entry_price,
            exit_time: fmt_ts(t.exit_time),
            exit_price: t.exit_price,
            quantity: t.quantity,
            allocation_pct: t.allocation_pct,
            entry_fee: t.entry_fee,
            exit_fee: t.exit_fee,
            pnl: t.pnl,
            return_pct: t.return_pct,
            cash_after: t.cash_after,
            cumulative_pnl,
            equity,
            cumulative_return: equity / initial_capital - 1.0,
        }
    });
    write_rows(path, rows)
}

fn write_open_positions(path: &Path, output: &PipelineOutput) -> Result<(), RsiTraderError> {
    let mut positions: Vec<_> = output.result.portfolio.positions.values().collect();
    positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    let rows = positions.into_iter().map(|p| {
        let last_price = output
            .result
            .last_prices
            .get(&p.symbol)
            .copied()
            .unwrap_or(p.entry_price);
        OpenPositionRow {
            symbol: &p.symbol,
            entry_time: fmt_ts(p.entry_time),
            entry_price: p.entry_price,
            peak_price: p.peak_price,
            quantity: p.quantity,
            allocation_pct: p.allocation_pct,
            entry_fee: p.entry_fee,
            last_price,
            market_value: p.market_value(last_price),
            unrealized_pnl: p.unrealized_pnl(last_price),
        }
    });
    write_rows(path, rows)
}

fn write_signals(path: &Path, output: &PipelineOutput) -> Result<(), RsiTraderError> {
    let rows = output.result.signals.iter().flat_map(|(symbol, signals)| {
        signals.iter().map(move |s| SignalRow {
            symbol,
            timestamp: fmt_ts(s.timestamp),
            rsi_trigger: s.rsi_trigger,
            ma_passes: s.ma_passes,
            ma_total: s.ma_total,
            bb_trigger: s.bb_trigger,
            allocation_pct: s.allocation_pct,
            entry: s.entry,
        })
    });
    write_rows(path, rows)
}

fn write_daily(path: &Path, output: &PipelineOutput) -> Result<(), RsiTraderError> {
    let rows = output.daily.iter().map(|d| DailyRow {
        date: d.date.to_string(),
        cash: d.cash,
        equity: d.equity,
        daily_return: d.daily_return,
        cumulative_return: d.cumulative_return,
        drawdown: d.drawdown,
    });
    write_rows(path, rows)
}

fn summary_rows(output: &PipelineOutput, strategy: &Strategy, config: &BacktestConfig) -> Vec<SummaryRow> {
    let row = |metric: &'static str, value: String| SummaryRow { metric, value };
    let opt_date = |d: Option<NaiveDate>| fmt_date(d).unwrap_or_default();
    let a = &output.analysis;
    let s = &output.stats;
    let fees = config.effective_fees();

    let mut rows = vec![
        row("symbols", output.symbols.join(",")),
        row("start_date", config.start_date.to_string()),
        row("end_date", config.end_date.to_string()),
        row("initial_capital", config.initial_capital.to_string()),
        row("final_equity", output.result.final_equity().to_string()),
        row("rsi_period", strategy.rsi_period.to_string()),
        row("rsi_threshold", strategy.rsi_threshold.to_string()),
        row("trailing_stop_pct", strategy.trailing_stop_pct.to_string()),
        row(
            "ma_days",
            strategy
                .ma_days
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ),
        row("order_entry", strategy.order_entry.to_string()),
        row("taker_fee", fees.taker.to_string()),
        row("maker_fee", fees.maker.to_string()),
    ];
    if let Some(bb) = &strategy.bollinger {
        rows.push(row("bb_window", bb.window.to_string()));
        rows.push(row("bb_num_std", bb.num_std.to_string()));
        rows.push(row("bb_rule", bb.rule.to_string()));
    }
    rows.extend([
        row("total_trades", a.total_trades.to_string()),
        row("win_rate", a.win_rate.to_string()),
        row("total_return", a.total_return.to_string()),
        row("average_return_per_trade", a.average_return_per_trade.to_string()),
        row("max_trade_gain_pct", a.max_trade_gain_pct.to_string()),
        row("max_trade_loss_pct", a.max_trade_loss_pct.to_string()),
        row("total_pnl", a.total_pnl.to_string()),
        row("average_pnl_per_trade", a.average_pnl_per_trade.to_string()),
        row("max_trade_gain_pnl", a.max_trade_gain_pnl.to_string()),
        row("max_trade_loss_pnl", a.max_trade_loss_pnl.to_string()),
        row("annualized_mean", s.annualized_mean.to_string()),
        row("annualized_volatility", s.annualized_volatility.to_string()),
        row("sharpe_ratio", s.sharpe_ratio.to_string()),
        row("cagr", s.cagr.to_string()),
        row("daily_max_return", s.daily_max_return.to_string()),
        row("daily_max_return_date", opt_date(s.daily_max_return_date)),
        row("daily_min_return", s.daily_min_return.to_string()),
        row("daily_min_return_date", opt_date(s.daily_min_return_date)),
        row("max_drawdown", s.max_drawdown.to_string()),
        row("peak_date", opt_date(s.peak_date)),
        row("trough_date", opt_date(s.trough_date)),
        row("recovery_date", opt_date(s.recovery_date)),
        row(
            "days_to_recover",
            s.days_to_recover.map(|d| d.to_string()).unwrap_or_default(),
        ),
        row("mar_ratio", s.mar_ratio.to_string()),
    ]);
    rows
}

fn sweep_row(outcome: &SweepOutcome) -> SweepRow {
    let combo = &outcome.combination;
    let strategy = &combo.strategy;
    let a: Option<&TradeAnalysis> = outcome.analysis.as_ref();
    let s: Option<&SummaryStats> = outcome.stats.as_ref();
    let bb = strategy.bollinger.as_ref();
    let rt = &outcome.runtime;

    SweepRow {
        tickers: combo.tickers_label(),
        ma_days: combo.ma_label(),
        initial_capital: outcome.initial_capital,
        rsi_period: strategy.rsi_period,
        rsi_threshold: strategy.rsi_threshold,
        trailing_stop_pct: strategy.trailing_stop_pct,
        start_date: outcome.start_date.to_string(),
        end_date: outcome.end_date.to_string(),
        total_trades: a.map(|a| a.total_trades),
        win_rate: a.map(|a| a.win_rate),
        total_return: a.map(|a| a.total_return),
        average_return_per_trade: a.map(|a| a.average_return_per_trade),
        max_trade_gain_pct: a.map(|a| a.max_trade_gain_pct),
        max_trade_loss_pct: a.map(|a| a.max_trade_loss_pct),
        total_pnl: a.map(|a| a.total_pnl),
        average_pnl_per_trade: a.map(|a| a.average_pnl_per_trade),
        max_trade_gain_pnl: a.map(|a| a.max_trade_gain_pnl),
        max_trade_loss_pnl: a.map(|a| a.max_trade_loss_pnl),
        annualized_mean: s.map(|s| s.annualized_mean),
        annualized_volatility: s.map(|s| s.annualized_volatility),
        sharpe_ratio: s.map(|s| s.sharpe_ratio),
        cagr: s.map(|s| s.cagr),
        daily_max_return: s.map(|s| s.daily_max_return),
        daily_max_return_date: s.and_then(|s| fmt_date(s.daily_max_return_date)),
        daily_min_return: s.map(|s| s.daily_min_return),
        daily_min_return_date: s.and_then(|s| fmt_date(s.daily_min_return_date)),
        max_drawdown: s.map(|s| s.max_drawdown),
        peak_date: s.and_then(|s| fmt_date(s.peak_date)),
        trough_date: s.and_then(|s| fmt_date(s.trough_date)),
        recovery_date: s.and_then(|s| fmt_date(s.recovery_date)),
        days_to_recover: s.and_then(|s| s.days_to_recover),
        mar_ratio: s.map(|s| s.mar_ratio),
        total_runtime: round2(rt.total_elapsed),
        average_runtime: round2(rt.average_runtime),
        runtime: round2(rt.runtime),
        ema_runtime: round2(rt.ema_runtime),
        success_ema_runtime: rt.success_ema_runtime.map(round2),
        success: outcome.success(),
        error: outcome.error.clone(),
        order_entry: strategy.order_entry.as_str(),
        bb_rule: bb.map(|b| b.rule.as_str()),
        bb_window: bb.map(|b| b.window),
        bb_num_std: bb.map(|b| b.num_std),
        taker_fee: outcome.fees.taker,
        maker_fee: outcome.fees.maker,
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_run(
        &self,
        output: &PipelineOutput,
        strategy: &Strategy,
        config: &BacktestConfig,
        dir: &Path,
    ) -> Result<(), RsiTraderError> {
        fs::create_dir_all(dir).map_err(|e| report_err(dir, e))?;

        write_trades(&dir.join("trades.csv"), output, config.initial_capital)?;
        write_open_positions(&dir.join("open_positions.csv"), output)?;
        write_signals(&dir.join("signals.csv"), output)?;
        write_daily(&dir.join("daily_performance.csv"), output)?;
        write_rows(&dir.join("summary.csv"), summary_rows(output, strategy, config))?;

        log::debug!("wrote run artifacts to {}", dir.display());
        Ok(())
    }

    fn append_sweep_result(&self, outcome: &SweepOutcome, path: &Path) -> Result<(), RsiTraderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| report_err(parent, e))?;
        }
        let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| report_err(path, e))?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(sweep_row(outcome)).map_err(|e| report_err(path, e))?;
        wtr.flush().map_err(|e| report_err(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::BacktestResult;
    use crate::domain::execution::FeeSchedule;
    use crate::domain::performance::DailyPerformance;
    use crate::domain::portfolio::Portfolio;
    use crate::domain::position::{ClosedTrade, Position};
    use crate::domain::signal::Signal;
    use crate::domain::sweep::{EtaBasis, RuntimeSnapshot, SweepCombination};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        date(2024, 1, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            initial_capital: 1000.0,
            fees: FeeSchedule::default(),
            trading_fees: false,
            bars_per_day: 24,
            use_calendar_days: true,
            risk_free_rate: 0.0,
        }
    }

    fn trade(pnl: f64) -> ClosedTrade {
        ClosedTrade {
            symbol: "BTC-USD".into(),
            entry_time: ts(2, 1),
            entry_price: 100.0,
            exit_time: ts(3, 5),
            exit_price: 100.0 + pnl,
            quantity: 1.0,
            allocation_pct: 1.0,
            entry_fee: 0.0,
            exit_fee: 0.0,
            pnl,
            return_pct: pnl,
            cash_after: 1000.0 + pnl,
        }
    }

    fn output() -> PipelineOutput {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.record_trade(trade(10.0));
        portfolio.record_trade(trade(-4.0));
        portfolio.add_position(Position {
            symbol: "ETH-USD".into(),
            entry_time: ts(4, 0),
            entry_price: 50.0,
            peak_price: 55.0,
            quantity: 2.0,
            allocation_pct: 0.5,
            entry_fee: 0.0,
        });
        let mut last_prices = HashMap::new();
        last_prices.insert("ETH-USD".to_string(), 54.0);

        let signal = Signal {
            timestamp: ts(2, 0),
            rsi_trigger: true,
            ma_passes: 0,
            ma_total: 0,
            bb_trigger: true,
            allocation_pct: 1.0,
            entry: true,
        };
        let daily = vec![
            DailyPerformance {
                date: date(2024, 1, 2),
                cash: 1000.0,
                equity: 1000.0,
                daily_return: 0.0,
                cumulative_return: 0.0,
                drawdown: 0.0,
            },
            DailyPerformance {
                date: date(2024, 1, 3),
                cash: 1006.0,
                equity: 1006.0,
                daily_return: 0.006,
                cumulative_return: 0.006,
                drawdown: 0.0,
            },
        ];
        let analysis = TradeAnalysis::compute(&portfolio.closed_trades, &daily, 1000.0);
        let stats = SummaryStats::compute(&daily, true, 0.0);

        PipelineOutput {
            symbols: vec!["BTC-USD".into(), "ETH-USD".into()],
            skipped: Vec::new(),
            bar_count: 0,
            timeline_len: 0,
            result: BacktestResult {
                portfolio,
                signals: vec![("BTC-USD".into(), vec![signal])],
                last_prices,
            },
            daily,
            analysis,
            stats,
        }
    }

    fn outcome(error: Option<&str>) -> SweepOutcome {
        SweepOutcome {
            combination: SweepCombination {
                index: 1,
                symbols: vec!["BTC-USD".into()],
                strategy: Strategy::default(),
                trading_fees: false,
            },
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            initial_capital: 1000.0,
            fees: FeeSchedule::disabled(),
            analysis: None,
            stats: None,
            runtime: RuntimeSnapshot {
                runtime: 1.234,
                total_elapsed: 1.234,
                average_runtime: 1.234,
                ema_runtime: 1.234,
                success_ema_runtime: None,
                eta_seconds: 0.0,
                eta_basis: EtaBasis::AvgAll,
            },
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn write_run_creates_every_artifact() {
        let dir = TempDir::new().unwrap();
        let run_dir = dir.path().join("nested").join("run");
        CsvReportAdapter::new()
            .write_run(&output(), &Strategy::default(), &config(), &run_dir)
            .unwrap();

        for name in [
            "trades.csv",
            "open_positions.csv",
            "signals.csv",
            "daily_performance.csv",
            "summary.csv",
        ] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn trades_carry_running_totals() {
        let dir = TempDir::new().unwrap();
        CsvReportAdapter::new()
            .write_run(&output(), &Strategy::default(), &config(), dir.path())
            .unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("trades.csv")).unwrap();
        let headers = rdr.headers().unwrap().clone();
        let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][col("cumulative_pnl")], "6.0");
        assert_eq!(&rows[1][col("equity")], "1006.0");
        let cum: f64 = rows[1][col("cumulative_return")].parse().unwrap();
        assert!((cum - 0.006).abs() < 1e-12);
    }

    #[test]
    fn open_positions_marked_at_last_price() {
        let dir = TempDir::new().unwrap();
        CsvReportAdapter::new()
            .write_run(&output(), &Strategy::default(), &config(), dir.path())
            .unwrap();

        let content = fs::read_to_string(dir.path().join("open_positions.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("ETH-USD,2024-01-04 00:00:00,50.0,55.0,2.0,0.5,"));
        assert!(lines[1].ends_with(",54.0,108.0,8.0"));
    }

    #[test]
    fn summary_is_key_value() {
        let dir = TempDir::new().unwrap();
        CsvReportAdapter::new()
            .write_run(&output(), &Strategy::default(), &config(), dir.path())
            .unwrap();

        let content = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert!(content.starts_with("metric,value\n"));
        assert!(content.contains("\ntotal_trades,2\n"));
        assert!(content.contains("\nsymbols,\"BTC-USD,ETH-USD\"\n"));
    }

    #[test]
    fn appending_twice_keeps_one_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results").join("sweep.csv");
        let adapter = CsvReportAdapter::new();

        adapter.append_sweep_result(&outcome(None), &path).unwrap();
        adapter
            .append_sweep_result(&outcome(Some("no data for BTC-USD")), &path)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("TICKERS").count(), 1);

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        let success = headers.iter().position(|h| h == "Success").unwrap();
        let error = headers.iter().position(|h| h == "Error").unwrap();
        let runtime = headers.iter().position(|h| h == "Runtime (s)").unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][success], "true");
        assert_eq!(&rows[0][runtime], "1.23");
        assert_eq!(&rows[1][success], "false");
        assert_eq!(&rows[1][error], "no data for BTC-USD");
    }
}
