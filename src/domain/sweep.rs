//! Parameter sweeps over the backtest pipeline.
//!
//! A [`SweepGrid`] expands into the cartesian product of its value lists.
//! Each combination runs the full pipeline; a failing combination is recorded
//! with its error and the sweep moves on. Result rows are appended as they
//! complete so an interrupted sweep keeps what it finished.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Datelike, NaiveDate};

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::RsiTraderError;
use crate::domain::execution::FeeSchedule;
use crate::domain::metrics::{SummaryStats, TradeAnalysis};
use crate::domain::pipeline::run_pipeline;
use crate::domain::strategy::{BbRule, BollingerParams, OrderEntry, Strategy};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const RUNTIME_EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub ticker_sets: Vec<Vec<String>>,
    pub ma_sets: Vec<Vec<usize>>,
    pub rsi_periods: Vec<usize>,
    pub rsi_thresholds: Vec<f64>,
    pub trailing_stops: Vec<f64>,
    pub order_entries: Vec<OrderEntry>,
    pub use_bbands: Vec<bool>,
    pub bb_windows: Vec<usize>,
    pub bb_num_stds: Vec<f64>,
    pub bb_rules: Vec<BbRule>,
    pub trading_fees: Vec<bool>,
}

impl SweepGrid {
    /// A one-combination grid reproducing `strategy` on `symbols`.
    pub fn single(symbols: Vec<String>, strategy: &Strategy, trading_fees: bool) -> Self {
        let bb = strategy.bollinger.clone().unwrap_or(BollingerParams {
            window: 20,
            num_std: 2.0,
            rule: BbRule::TouchLower,
        });
        SweepGrid {
            ticker_sets: vec![symbols],
            ma_sets: vec![strategy.ma_days.clone()],
            rsi_periods: vec![strategy.rsi_period],
            rsi_thresholds: vec![strategy.rsi_threshold],
            trailing_stops: vec![strategy.trailing_stop_pct],
            order_entries: vec![strategy.order_entry],
            use_bbands: vec![strategy.bollinger.is_some()],
            bb_windows: vec![bb.window],
            bb_num_stds: vec![bb.num_std],
            bb_rules: vec![bb.rule],
            trading_fees: vec![trading_fees],
        }
    }

    fn radices(&self) -> [usize; 11] {
        [
            self.ticker_sets.len(),
            self.ma_sets.len(),
            self.rsi_periods.len(),
            self.rsi_thresholds.len(),
            self.trailing_stops.len(),
            self.order_entries.len(),
            self.use_bbands.len(),
            self.bb_windows.len(),
            self.bb_num_stds.len(),
            self.bb_rules.len(),
            self.trading_fees.len(),
        ]
    }

    pub fn len(&self) -> usize {
        self.radices().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, varying the last list fastest. `use_rsi` and
    /// `use_ma` are taken from `base`.
    pub fn combinations(&self, base: &Strategy) -> Vec<SweepCombination> {
        let radices = self.radices();
        (0..self.len())
            .map(|n| {
                let mut rem = n;
                let mut i = [0usize; 11];
                for (slot, radix) in i.iter_mut().zip(radices).rev() {
                    *slot = rem % radix;
                    rem /= radix;
                }
                let use_bbands = self.use_bbands[i[6]];
                SweepCombination {
                    index: n + 1,
                    symbols: self.ticker_sets[i[0]].clone(),
                    strategy: Strategy {
                        rsi_period: self.rsi_periods[i[2]],
                        rsi_threshold: self.rsi_thresholds[i[3]],
                        trailing_stop_pct: self.trailing_stops[i[4]],
                        ma_days: self.ma_sets[i[1]].clone(),
                        order_entry: self.order_entries[i[5]],
                        use_rsi: base.use_rsi,
                        use_ma: base.use_ma,
                        bollinger: use_bbands.then(|| BollingerParams {
                            window: self.bb_windows[i[7]],
                            num_std: self.bb_num_stds[i[8]],
                            rule: self.bb_rules[i[9]],
                        }),
                    },
                    trading_fees: self.trading_fees[i[10]],
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepCombination {
    /// 1-based position in the sweep.
    pub index: usize,
    pub symbols: Vec<String>,
    pub strategy: Strategy,
    pub trading_fees: bool,
}

impl SweepCombination {
    pub fn tickers_label(&self) -> String {
        format!("[{}]", self.symbols.join(","))
    }

    /// `[0]` when there is no moving-average filter.
    pub fn ma_label(&self) -> String {
        if self.strategy.ma_days.is_empty() {
            "[0]".to_string()
        } else {
            let days: Vec<String> = self.strategy.ma_days.iter().map(|d| d.to_string()).collect();
            format!("[{}]", days.join(","))
        }
    }

    pub fn title(&self, start_date: NaiveDate, end_date: NaiveDate) -> String {
        let s = &self.strategy;
        let mut title = format!(
            "{}_{}_{}_MA-{}_RP-{}_RT-{}_TS-{:.3}_{}",
            start_date,
            end_date,
            self.tickers_label(),
            self.ma_label(),
            s.rsi_period,
            fmt_number(s.rsi_threshold),
            s.trailing_stop_pct,
            s.order_entry
        );
        if let Some(bb) = &s.bollinger {
            title.push_str(&format!(
                "_BBR-{}_BBW-{}_BBS-{}",
                bb.rule,
                bb.window,
                fmt_decimal(bb.num_std)
            ));
        }
        if self.trading_fees {
            title.push_str("_TF");
        }
        title
    }

    /// `output_dir/Iterations/<end year>/MA-<list>/<title>/`
    pub fn artifact_dir(&self, output_dir: &Path, start_date: NaiveDate, end_date: NaiveDate) -> PathBuf {
        output_dir
            .join("Iterations")
            .join(end_date.year().to_string())
            .join(format!("MA-{}", self.ma_label()))
            .join(self.title(start_date, end_date))
    }

    pub fn backtest_config(&self, base: &BacktestConfig) -> BacktestConfig {
        BacktestConfig {
            trading_fees: self.trading_fees,
            ..base.clone()
        }
    }
}

/// Integers print without a fractional part, others as-is.
fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Always keeps at least one decimal place (`2.0`, `2.5`).
fn fmt_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// `h:mm:ss`, rounded to the nearest second.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, rem) = (total / 3600, total % 3600);
    format!("{}:{:02}:{:02}", h, rem / 60, rem % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaBasis {
    EmaSuccess,
    AvgSuccess,
    EmaAll,
    AvgAll,
}

impl EtaBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            EtaBasis::EmaSuccess => "EMA(success)",
            EtaBasis::AvgSuccess => "Avg(success)",
            EtaBasis::EmaAll => "EMA(all)",
            EtaBasis::AvgAll => "Avg(all)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSnapshot {
    pub runtime: f64,
    pub total_elapsed: f64,
    pub average_runtime: f64,
    pub ema_runtime: f64,
    pub success_ema_runtime: Option<f64>,
    pub eta_seconds: f64,
    pub eta_basis: EtaBasis,
}

/// Tracks combination runtimes and estimates the time remaining, preferring
/// successful runs since failures tend to end early.
#[derive(Debug, Clone, Default)]
pub struct RuntimeTracker {
    runs: usize,
    elapsed: f64,
    ema: Option<f64>,
    success_count: usize,
    success_elapsed: f64,
    success_ema: Option<f64>,
}

impl RuntimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, runtime: f64, success: bool, remaining: usize) -> RuntimeSnapshot {
        self.runs += 1;
        self.elapsed += runtime;
        self.ema = Some(ema_step(self.ema, runtime));
        if success {
            self.success_count += 1;
            self.success_elapsed += runtime;
            self.success_ema = Some(ema_step(self.success_ema, runtime));
        }

        let average_runtime = self.elapsed / self.runs as f64;
        let ema_runtime = self.ema.unwrap_or(runtime);

        let (per_run, eta_basis) = match self.success_ema {
            Some(ema) if self.success_count > 1 => (ema, EtaBasis::EmaSuccess),
            Some(_) => (
                self.success_elapsed / self.success_count as f64,
                EtaBasis::AvgSuccess,
            ),
            None if self.runs > 1 => (ema_runtime, EtaBasis::EmaAll),
            None => (average_runtime, EtaBasis::AvgAll),
        };

        RuntimeSnapshot {
            runtime,
            total_elapsed: self.elapsed,
            average_runtime,
            ema_runtime,
            success_ema_runtime: self.success_ema,
            eta_seconds: per_run * remaining as f64,
            eta_basis,
        }
    }
}

fn ema_step(prev: Option<f64>, value: f64) -> f64 {
    match prev {
        None => value,
        Some(p) => RUNTIME_EMA_ALPHA * value + (1.0 - RUNTIME_EMA_ALPHA) * p,
    }
}

/// One completed combination, successful or not.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub combination: SweepCombination,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    /// Fees actually charged (zero when trading fees are off).
    pub fees: FeeSchedule,
    pub analysis: Option<TradeAnalysis>,
    pub stats: Option<SummaryStats>,
    pub runtime: RuntimeSnapshot,
    pub error: Option<String>,
}

impl SweepOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: f64,
}

pub struct SweepContext<'a> {
    pub data_port: &'a dyn DataPort,
    pub report_port: &'a dyn ReportPort,
    pub output_dir: &'a Path,
    pub results_path: &'a Path,
}

pub fn run_sweep(
    grid: &SweepGrid,
    base_strategy: &Strategy,
    base_config: &BacktestConfig,
    ctx: &SweepContext<'_>,
) -> Result<SweepSummary, RsiTraderError> {
    let combinations = grid.combinations(base_strategy);
    let total = combinations.len();
    let mut tracker = RuntimeTracker::new();
    let mut succeeded = 0;

    log::info!("sweeping {} combinations", total);

    for combination in combinations {
        let started = Instant::now();
        let config = combination.backtest_config(base_config);
        let title = combination.title(config.start_date, config.end_date);

        let run = run_pipeline(ctx.data_port, &combination.symbols, &combination.strategy, &config)
            .and_then(|output| {
                let dir = combination.artifact_dir(ctx.output_dir, config.start_date, config.end_date);
                ctx.report_port
                    .write_run(&output, &combination.strategy, &config, &dir)?;
                Ok(output)
            });

        let (analysis, stats, error) = match run {
            Ok(output) => {
                succeeded += 1;
                (Some(output.analysis), Some(output.stats), None)
            }
            Err(e) => {
                log::warn!("[{}/{}] {} failed: {}", combination.index, total, title, e);
                (None, None, Some(e.to_string()))
            }
        };

        let remaining = total - combination.index;
        let runtime = tracker.record(started.elapsed().as_secs_f64(), error.is_none(), remaining);
        log::info!(
            "[{}/{}] {} done in {} (eta {} via {})",
            combination.index,
            total,
            title,
            format_duration(runtime.runtime),
            format_duration(runtime.eta_seconds),
            runtime.eta_basis.as_str()
        );

        let outcome = SweepOutcome {
            start_date: config.start_date,
            end_date: config.end_date,
            initial_capital: config.initial_capital,
            fees: config.effective_fees(),
            combination,
            analysis,
            stats,
            runtime,
            error,
        };
        ctx.report_port.append_sweep_result(&outcome, ctx.results_path)?;
    }

    Ok(SweepSummary {
        total,
        succeeded,
        failed: total - succeeded,
        elapsed: tracker.elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grid() -> SweepGrid {
        SweepGrid {
            ticker_sets: vec![vec!["BTC-USD".into()], vec!["BTC-USD".into(), "ETH-USD".into()]],
            ma_sets: vec![vec![], vec![7, 14]],
            rsi_periods: vec![6, 14],
            rsi_thresholds: vec![20.0, 30.0, 40.0],
            trailing_stops: vec![0.01],
            order_entries: vec![OrderEntry::Market, OrderEntry::Limit],
            use_bbands: vec![false, true],
            bb_windows: vec![20],
            bb_num_stds: vec![2.0],
            bb_rules: vec![BbRule::TouchLower],
            trading_fees: vec![true],
        }
    }

    #[test]
    fn combinations_cover_cartesian_product() {
        let g = grid();
        let combos = g.combinations(&Strategy::default());
        assert_eq!(g.len(), 2 * 2 * 2 * 3 * 2 * 2);
        assert_eq!(combos.len(), g.len());
        assert_eq!(combos[0].index, 1);
        assert_eq!(combos.last().unwrap().index, g.len());

        let mut titles: Vec<String> = combos
            .iter()
            .map(|c| c.title(date(2024, 1, 1), date(2024, 6, 30)))
            .collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), combos.len());
    }

    #[test]
    fn empty_list_means_no_combinations() {
        let g = SweepGrid {
            rsi_periods: vec![],
            ..grid()
        };
        assert!(g.is_empty());
        assert!(g.combinations(&Strategy::default()).is_empty());
    }

    #[test]
    fn single_grid_reproduces_strategy() {
        let strategy = Strategy {
            ma_days: vec![7],
            ..Strategy::default()
        };
        let g = SweepGrid::single(vec!["BTC-USD".into()], &strategy, false);
        let combos = g.combinations(&strategy);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].strategy, strategy);
        assert!(!combos[0].trading_fees);
    }

    #[test]
    fn title_format() {
        let combo = SweepCombination {
            index: 1,
            symbols: vec!["BTC-USD".into(), "ETH-USD".into()],
            strategy: Strategy {
                rsi_period: 14,
                rsi_threshold: 30.0,
                trailing_stop_pct: 0.015,
                ma_days: vec![],
                order_entry: OrderEntry::Limit,
                use_rsi: true,
                use_ma: true,
                bollinger: Some(BollingerParams {
                    window: 20,
                    num_std: 2.0,
                    rule: BbRule::TouchLower,
                }),
            },
            trading_fees: true,
        };
        assert_eq!(
            combo.title(date(2024, 1, 1), date(2024, 12, 31)),
            "2024-01-01_2024-12-31_[BTC-USD,ETH-USD]_MA-[0]_RP-14_RT-30_TS-0.015_limit_BBR-touch_lower_BBW-20_BBS-2.0_TF"
        );
        assert_eq!(
            combo.artifact_dir(Path::new("out"), date(2024, 1, 1), date(2024, 12, 31)),
            Path::new("out/Iterations/2024/MA-[0]").join(combo.title(date(2024, 1, 1), date(2024, 12, 31)))
        );
    }

    #[test]
    fn title_without_bands_or_fees() {
        let combo = SweepCombination {
            index: 1,
            symbols: vec!["BTC-USD".into()],
            strategy: Strategy {
                rsi_threshold: 27.5,
                ma_days: vec![7, 14],
                ..Strategy::default()
            },
            trading_fees: false,
        };
        assert_eq!(
            combo.title(date(2024, 1, 1), date(2024, 2, 1)),
            "2024-01-01_2024-02-01_[BTC-USD]_MA-[7,14]_RP-14_RT-27.5_TS-0.020_market"
        );
    }

    #[test]
    fn format_duration_hms() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(59.6), "0:01:00");
        assert_eq!(format_duration(3_725.0), "1:02:05");
    }

    #[test]
    fn tracker_prefers_successful_runs() {
        let mut tracker = RuntimeTracker::new();

        let snap = tracker.record(1.0, false, 10);
        assert_eq!(snap.eta_basis, EtaBasis::AvgAll);
        assert!((snap.eta_seconds - 10.0).abs() < 1e-9);

        let snap = tracker.record(3.0, false, 9);
        assert_eq!(snap.eta_basis, EtaBasis::EmaAll);
        assert!((snap.ema_runtime - (0.2 * 3.0 + 0.8 * 1.0)).abs() < 1e-9);

        let snap = tracker.record(10.0, true, 8);
        assert_eq!(snap.eta_basis, EtaBasis::AvgSuccess);
        assert!((snap.eta_seconds - 80.0).abs() < 1e-9);

        let snap = tracker.record(20.0, true, 2);
        assert_eq!(snap.eta_basis, EtaBasis::EmaSuccess);
        let ema = 0.2 * 20.0 + 0.8 * 10.0;
        assert!((snap.success_ema_runtime.unwrap() - ema).abs() < 1e-9);
        assert!((snap.eta_seconds - 2.0 * ema).abs() < 1e-9);
        assert!((snap.total_elapsed - 34.0).abs() < 1e-9);
        assert!((snap.average_runtime - 8.5).abs() < 1e-9);
    }
}
