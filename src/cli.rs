//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::{
    parse_bool_list, parse_date, parse_list, parse_ma_days, parse_ma_sets,
    parse_resample_periods, parse_ticker_sets, read_number, validate_backtest_config,
    validate_data_config, validate_strategy_config, validate_sweep_config,
};
use crate::domain::error::RsiTraderError;
use crate::domain::execution::{FeeSchedule, DEFAULT_MAKER_FEE, DEFAULT_TAKER_FEE};
use crate::domain::metrics::symbol_summaries;
use crate::domain::pipeline::{run_pipeline, PipelineOutput};
use crate::domain::resample::resample_bars;
use crate::domain::strategy::{BbRule, BollingerParams, OrderEntry, Strategy};
use crate::domain::sweep::{format_duration, run_sweep, SweepCombination, SweepContext, SweepGrid};
use crate::domain::universe::{parse_symbols, SkipReason};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Parser, Debug)]
#[command(name = "rsitrader", about = "RSI / moving-average / trailing-stop backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Artifact directory (defaults to `[report] output_dir/<title>`)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated symbols overriding `[backtest] symbols`
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run every combination of the `[sweep]` grid
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        /// Root directory for per-combination artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Results CSV that sweep rows are appended to
        #[arg(long)]
        results: Option<PathBuf>,
    },
    /// Aggregate bars into daily, month-end or quarter-end files
    Resample {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
        /// Comma-separated periods: D, ME, QE
        #[arg(long, default_value = "D,ME,QE")]
        periods: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            symbols,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbols.as_deref())
            } else {
                run_backtest(&config, output.as_deref(), symbols.as_deref())
            }
        }
        Command::Sweep {
            config,
            output,
            results,
        } => run_sweep_command(&config, output.as_deref(), results.as_deref()),
        Command::Resample {
            config,
            symbols,
            periods,
        } => run_resample(&config, symbols.as_deref(), &periods),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbols } => run_info(&config, symbols.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RsiTraderError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn run_backtest(
    config_path: &Path,
    output_override: Option<&Path>,
    symbols_override: Option<&str>,
) -> Result<(), RsiTraderError> {
    // Stage 1: load and validate config
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;

    // Stage 2: build strategy, backtest config and universe
    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let symbols = resolve_symbols(symbols_override, &config)?;
    let data_port = CsvAdapter::from_config(&config)?;

    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        symbols.len(),
        bt_config.start_date,
        bt_config.end_date
    );

    // Stage 3: pipeline
    let output = run_pipeline(&data_port, &symbols, &strategy, &bt_config)?;
    print_summary(&output, &bt_config);

    // Stage 4: reports
    let dir = match output_override {
        Some(dir) => dir.to_path_buf(),
        None => {
            let combination = SweepCombination {
                index: 1,
                symbols,
                strategy: strategy.clone(),
                trading_fees: bt_config.trading_fees,
            };
            output_dir(&config).join(combination.title(bt_config.start_date, bt_config.end_date))
        }
    };
    CsvReportAdapter::new().write_run(&output, &strategy, &bt_config, &dir)?;
    eprintln!("\nReports written to: {}", dir.display());
    Ok(())
}

pub fn run_dry_run(config_path: &Path, symbols_override: Option<&str>) -> Result<(), RsiTraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;
    eprintln!("Config validated successfully");

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let symbols = resolve_symbols(symbols_override, &config)?;
    let data_port = CsvAdapter::from_config(&config)?;

    eprintln!("\nStrategy:");
    eprintln!("  rsi:            period {} below {}", strategy.rsi_period, strategy.rsi_threshold);
    eprintln!("  trailing stop:  {:.2}%", strategy.trailing_stop_pct * 100.0);
    eprintln!("  ma days:        {:?}", strategy.ma_days);
    eprintln!("  order entry:    {}", strategy.order_entry);
    if let Some(bb) = &strategy.bollinger {
        eprintln!("  bollinger:      {} x{} ({})", bb.window, bb.num_std, bb.rule);
    }

    let mut indicators: Vec<String> = strategy
        .required_indicators(bt_config.bars_per_day)
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicators.sort();
    eprintln!("\nIndicators to compute:");
    for ind in &indicators {
        eprintln!("  {}", ind);
    }

    eprintln!("\nUniverse ({}):", data_port.root().display());
    eprintln!("  symbols: {}", symbols.join(", "));

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_sweep_command(
    config_path: &Path,
    output_override: Option<&Path>,
    results_override: Option<&Path>,
) -> Result<(), RsiTraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;
    validate_sweep_config(&config)?;

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let symbols = resolve_symbols(None, &config)?;
    let grid = build_sweep_grid(&config, symbols, &strategy, bt_config.trading_fees)?;

    let output_dir = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_dir(&config));
    let results_path = results_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "results_file").map(PathBuf::from))
        .unwrap_or_else(|| {
            output_dir.join(format!(
                "multi_asset_strategy_results_{}_{}.csv",
                bt_config.start_date, bt_config.end_date
            ))
        });

    eprintln!(
        "Sweeping {} combinations, {} to {}",
        grid.len(),
        bt_config.start_date,
        bt_config.end_date
    );

    let data_port = CsvAdapter::from_config(&config)?;
    let report_port = CsvReportAdapter::new();
    let ctx = SweepContext {
        data_port: &data_port,
        report_port: &report_port,
        output_dir: &output_dir,
        results_path: &results_path,
    };
    let summary = run_sweep(&grid, &strategy, &bt_config, &ctx)?;

    eprintln!("\n=== Sweep Results ===");
    eprintln!("Combinations:     {}", summary.total);
    eprintln!("Succeeded:        {}", summary.succeeded);
    eprintln!("Failed:           {}", summary.failed);
    eprintln!("Elapsed:          {}", format_duration(summary.elapsed));
    eprintln!("\nResults appended to: {}", results_path.display());
    Ok(())
}

fn run_resample(
    config_path: &Path,
    symbols_override: Option<&str>,
    periods: &str,
) -> Result<(), RsiTraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    let periods = parse_resample_periods(periods)
        .map_err(|e| RsiTraderError::invalid("resample", "periods", e))?;
    let data_port = CsvAdapter::from_config(&config)?;

    let symbols = match symbols_override {
        Some(_) => resolve_symbols(symbols_override, &config)?,
        None if config.get_string("backtest", "symbols").is_some() => resolve_symbols(None, &config)?,
        None => data_port.list_symbols()?,
    };

    for symbol in &symbols {
        let bars = data_port.fetch_bars(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
        if bars.is_empty() {
            eprintln!("{}: no data found", symbol);
            continue;
        }
        for &period in &periods {
            let resampled = resample_bars(&bars, period);
            let path = data_port.write_bars(symbol, &resampled, period)?;
            eprintln!(
                "{}: {} bars -> {} {} bars ({})",
                symbol,
                bars.len(),
                resampled.len(),
                period,
                path.display()
            );
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), RsiTraderError> {
    let config = load_config(config_path)?;

    validate_data_config(&config)?;
    eprintln!("[data]      ok");
    validate_backtest_config(&config)?;
    eprintln!("[backtest]  ok");
    validate_strategy_config(&config)?;
    eprintln!("[strategy]  ok");
    validate_sweep_config(&config)?;

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let symbols = resolve_symbols(None, &config)?;
    let grid = build_sweep_grid(&config, symbols, &strategy, bt_config.trading_fees)?;
    eprintln!("[sweep]     ok ({} combinations)", grid.len());

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), RsiTraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    let data_port = CsvAdapter::from_config(&config)?;

    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_port.root().display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(config_path: &Path, symbols_override: Option<&str>) -> Result<(), RsiTraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    let data_port = CsvAdapter::from_config(&config)?;
    let symbols = resolve_symbols(symbols_override, &config)?;

    for symbol in &symbols {
        match data_port.get_data_range(symbol) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", symbol, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", symbol),
            Err(e) => eprintln!("error reading {}: {}", symbol, e),
        }
    }
    Ok(())
}

fn print_summary(output: &PipelineOutput, config: &BacktestConfig) {
    let a = &output.analysis;
    let s = &output.stats;

    if !output.skipped.is_empty() {
        eprintln!("\n=== Skipped Symbols ===");
        for skipped in &output.skipped {
            match skipped.reason {
                SkipReason::NoData => eprintln!("  {}: no data", skipped.symbol),
                SkipReason::InsufficientBars { bars } => {
                    eprintln!("  {}: only {} bars", skipped.symbol, bars)
                }
            }
        }
    }

    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Symbols:          {}", output.symbols.join(", "));
    eprintln!("Bars / steps:     {} / {}", output.bar_count, output.timeline_len);
    eprintln!("Initial Capital:  {:.2}", config.initial_capital);
    eprintln!("Final Equity:     {:.2}", output.result.final_equity());
    eprintln!("Total Return:     {:.2}%", a.total_return * 100.0);
    eprintln!("CAGR:             {:.2}%", s.cagr * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", s.sharpe_ratio);
    eprintln!("Volatility:       {:.2}%", s.annualized_volatility * 100.0);
    eprintln!("Max Drawdown:     {:.2}%", s.max_drawdown * 100.0);
    eprintln!("MAR Ratio:        {:.2}", s.mar_ratio);
    eprintln!("Total Trades:     {}", a.total_trades);
    eprintln!("Win Rate:         {:.1}%", a.win_rate * 100.0);
    eprintln!("Total PnL:        {:.2}", a.total_pnl);
    eprintln!("Open Positions:   {}", output.result.portfolio.positions.len());

    let per_symbol = symbol_summaries(&output.result.portfolio.closed_trades);
    if !per_symbol.is_empty() {
        eprintln!("\n=== Per-Symbol Summary ===");
        for summary in &per_symbol {
            let pnl_sign = if summary.total_pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {}:  {} trades, {} wins, {}{:.2}",
                summary.symbol, summary.trades, summary.wins, pnl_sign, summary.total_pnl,
            );
        }
    }
}

fn output_dir(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("report", "output_dir")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Symbols from the command line, or `[backtest] symbols`.
pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, RsiTraderError> {
    let raw = match symbols_override {
        Some(s) => s.to_string(),
        None => config
            .get_string("backtest", "symbols")
            .ok_or_else(|| RsiTraderError::missing("backtest", "symbols"))?,
    };
    parse_symbols(&raw).map_err(|e| RsiTraderError::invalid("backtest", "symbols", e.to_string()))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, RsiTraderError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: read_number(config, "backtest", "initial_capital")?.unwrap_or(10_000.0),
        fees: FeeSchedule {
            taker: read_number(config, "backtest", "taker_fee")?.unwrap_or(DEFAULT_TAKER_FEE),
            maker: read_number(config, "backtest", "maker_fee")?.unwrap_or(DEFAULT_MAKER_FEE),
        },
        trading_fees: config.get_bool("backtest", "trading_fees", true),
        bars_per_day: read_number(config, "data", "bars_per_day")?.unwrap_or(1440),
        use_calendar_days: config.get_bool("backtest", "use_calendar_days", true),
        risk_free_rate: read_number(config, "backtest", "risk_free_rate")?.unwrap_or(0.0),
    })
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, RsiTraderError> {
    let defaults = Strategy::default();

    let ma_days = match config.get_string("strategy", "ma_days") {
        Some(raw) => parse_ma_days(&raw).map_err(|e| RsiTraderError::invalid("strategy", "ma_days", e))?,
        None => defaults.ma_days,
    };
    let order_entry = match config.get_string("strategy", "order_entry") {
        Some(raw) => raw
            .parse::<OrderEntry>()
            .map_err(|e| RsiTraderError::invalid("strategy", "order_entry", e))?,
        None => defaults.order_entry,
    };

    let bollinger = if config.get_bool("strategy", "use_bbands", false) {
        let rule = match config.get_string("strategy", "bb_rule") {
            Some(raw) => raw
                .parse::<BbRule>()
                .map_err(|e| RsiTraderError::invalid("strategy", "bb_rule", e))?,
            None => BbRule::TouchLower,
        };
        Some(BollingerParams {
            window: read_number(config, "strategy", "bb_window")?.unwrap_or(20),
            num_std: read_number(config, "strategy", "bb_num_std")?.unwrap_or(2.0),
            rule,
        })
    } else {
        None
    };

    Ok(Strategy {
        rsi_period: read_number(config, "strategy", "rsi_period")?.unwrap_or(defaults.rsi_period),
        rsi_threshold: read_number(config, "strategy", "rsi_threshold")?
            .unwrap_or(defaults.rsi_threshold),
        trailing_stop_pct: read_number(config, "strategy", "trailing_stop_pct")?
            .unwrap_or(defaults.trailing_stop_pct),
        ma_days,
        order_entry,
        use_rsi: config.get_bool("strategy", "use_rsi", defaults.use_rsi),
        use_ma: config.get_bool("strategy", "use_ma", defaults.use_ma),
        bollinger,
    })
}

fn sweep_list(config: &dyn ConfigPort, key: &str) -> Option<String> {
    config.get_string("sweep", key).filter(|s| !s.trim().is_empty())
}

fn sweep_err(key: &str) -> impl Fn(String) -> RsiTraderError + '_ {
    move |e| RsiTraderError::invalid("sweep", key, e)
}

/// The `[sweep]` grid; unset lists keep the single configured value.
pub fn build_sweep_grid(
    config: &dyn ConfigPort,
    symbols: Vec<String>,
    strategy: &Strategy,
    trading_fees: bool,
) -> Result<SweepGrid, RsiTraderError> {
    let mut grid = SweepGrid::single(symbols, strategy, trading_fees);

    if let Some(raw) = sweep_list(config, "ticker_sets") {
        grid.ticker_sets = parse_ticker_sets(&raw).map_err(sweep_err("ticker_sets"))?;
    }
    if let Some(raw) = sweep_list(config, "ma_sets") {
        grid.ma_sets = parse_ma_sets(&raw).map_err(sweep_err("ma_sets"))?;
    }
    if let Some(raw) = sweep_list(config, "rsi_periods") {
        grid.rsi_periods = parse_list(&raw).map_err(sweep_err("rsi_periods"))?;
    }
    if let Some(raw) = sweep_list(config, "rsi_thresholds") {
        grid.rsi_thresholds = parse_list(&raw).map_err(sweep_err("rsi_thresholds"))?;
    }
    if let Some(raw) = sweep_list(config, "trailing_stops") {
        grid.trailing_stops = parse_list(&raw).map_err(sweep_err("trailing_stops"))?;
    }
    if let Some(raw) = sweep_list(config, "order_entries") {
        grid.order_entries = parse_list(&raw).map_err(sweep_err("order_entries"))?;
    }
    if let Some(raw) = sweep_list(config, "use_bbands") {
        grid.use_bbands = parse_bool_list(&raw).map_err(sweep_err("use_bbands"))?;
    }
    if let Some(raw) = sweep_list(config, "bb_windows") {
        grid.bb_windows = parse_list(&raw).map_err(sweep_err("bb_windows"))?;
    }
    if let Some(raw) = sweep_list(config, "bb_num_stds") {
        grid.bb_num_stds = parse_list(&raw).map_err(sweep_err("bb_num_stds"))?;
    }
    if let Some(raw) = sweep_list(config, "bb_rules") {
        grid.bb_rules = parse_list(&raw).map_err(sweep_err("bb_rules"))?;
    }
    if let Some(raw) = sweep_list(config, "trading_fees") {
        grid.trading_fees = parse_bool_list(&raw).map_err(sweep_err("trading_fees"))?;
    }
    Ok(grid)
}
