//! Trade analysis and summary statistics.

use chrono::NaiveDate;

use super::performance::DailyPerformance;
use super::position::ClosedTrade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

pub fn periods_per_year(use_calendar_days: bool) -> f64 {
    if use_calendar_days {
        CALENDAR_DAYS_PER_YEAR
    } else {
        TRADING_DAYS_PER_YEAR
    }
}

/// Trade-level figures. Percent fields are in percent, `win_rate`,
/// `total_return` and `max_drawdown` are fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeAnalysis {
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub average_return_per_trade: f64,
    pub max_trade_gain_pct: f64,
    pub max_trade_loss_pct: f64,
    pub total_pnl: f64,
    pub average_pnl_per_trade: f64,
    pub max_trade_gain_pnl: f64,
    pub max_trade_loss_pnl: f64,
    pub max_drawdown: f64,
}

impl TradeAnalysis {
    pub fn compute(trades: &[ClosedTrade], daily: &[DailyPerformance], initial_capital: f64) -> Self {
        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();

        let mean = |total: f64| {
            if total_trades > 0 {
                total / total_trades as f64
            } else {
                0.0
            }
        };

        let final_equity = daily.last().map(|d| d.equity).unwrap_or(initial_capital);
        let total_return = if initial_capital > 0.0 {
            final_equity / initial_capital - 1.0
        } else {
            0.0
        };
        let max_drawdown = daily.iter().map(|d| d.drawdown).fold(0.0, f64::min);

        TradeAnalysis {
            total_trades,
            win_rate: mean(wins as f64),
            total_return,
            average_return_per_trade: mean(trades.iter().map(|t| t.return_pct).sum()),
            max_trade_gain_pct: extreme(trades.iter().map(|t| t.return_pct), f64::max),
            max_trade_loss_pct: extreme(trades.iter().map(|t| t.return_pct), f64::min),
            total_pnl,
            average_pnl_per_trade: mean(total_pnl),
            max_trade_gain_pnl: extreme(trades.iter().map(|t| t.pnl), f64::max),
            max_trade_loss_pnl: extreme(trades.iter().map(|t| t.pnl), f64::min),
            max_drawdown,
        }
    }
}

fn extreme(values: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> f64 {
    values.reduce(pick).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub total_pnl: f64,
}

/// Per-symbol trade counts and PnL, in order of first appearance.
pub fn symbol_summaries(trades: &[ClosedTrade]) -> Vec<SymbolSummary> {
    let mut out: Vec<SymbolSummary> = Vec::new();
    for trade in trades {
        let idx = match out.iter().position(|s| s.symbol == trade.symbol) {
            Some(i) => i,
            None => {
                out.push(SymbolSummary {
                    symbol: trade.symbol.clone(),
                    trades: 0,
                    wins: 0,
                    total_pnl: 0.0,
                });
                out.len() - 1
            }
        };
        let entry = &mut out[idx];
        entry.trades += 1;
        entry.wins += usize::from(trade.is_win());
        entry.total_pnl += trade.pnl;
    }
    out
}

/// Return-series statistics over the daily performance rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub annualized_mean: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub cagr: f64,
    pub daily_max_return: f64,
    pub daily_max_return_date: Option<NaiveDate>,
    pub daily_min_return: f64,
    pub daily_min_return_date: Option<NaiveDate>,
    pub max_drawdown: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
    pub recovery_date: Option<NaiveDate>,
    pub days_to_recover: Option<i64>,
    pub mar_ratio: f64,
}

impl SummaryStats {
    pub fn compute(daily: &[DailyPerformance], use_calendar_days: bool, risk_free_rate: f64) -> Self {
        let periods = periods_per_year(use_calendar_days);
        // The first row has no prior day to return against.
        let returns: Vec<(NaiveDate, f64)> = daily
            .iter()
            .skip(1)
            .map(|d| (d.date, d.daily_return))
            .collect();

        let n = returns.len() as f64;
        let mean = if n > 0.0 {
            returns.iter().map(|(_, r)| r).sum::<f64>() / n
        } else {
            0.0
        };
        let stddev = if n > 1.0 {
            let var = returns.iter().map(|(_, r)| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        } else {
            0.0
        };

        let annualized_mean = mean * periods;
        let annualized_volatility = stddev * periods.sqrt();
        let sharpe_ratio = if annualized_volatility > 0.0 {
            (annualized_mean - risk_free_rate) / annualized_volatility
        } else {
            0.0
        };

        let cagr = match (daily.first(), daily.last()) {
            (Some(first), Some(last)) if n > 0.0 && first.equity > 0.0 && last.equity > 0.0 => {
                (last.equity / first.equity).powf(periods / n) - 1.0
            }
            _ => 0.0,
        };

        let max = returns
            .iter()
            .copied()
            .reduce(|a, b| if b.1 > a.1 { b } else { a });
        let min = returns
            .iter()
            .copied()
            .reduce(|a, b| if b.1 < a.1 { b } else { a });

        let drawdown = max_drawdown_window(daily);
        let mar_ratio = if drawdown.max_drawdown < 0.0 {
            cagr / drawdown.max_drawdown.abs()
        } else {
            0.0
        };

        SummaryStats {
            annualized_mean,
            annualized_volatility,
            sharpe_ratio,
            cagr,
            daily_max_return: max.map(|m| m.1).unwrap_or(0.0),
            daily_max_return_date: max.map(|m| m.0),
            daily_min_return: min.map(|m| m.1).unwrap_or(0.0),
            daily_min_return_date: min.map(|m| m.0),
            max_drawdown: drawdown.max_drawdown,
            peak_date: drawdown.peak,
            trough_date: drawdown.trough,
            recovery_date: drawdown.recovery,
            days_to_recover: match (drawdown.trough, drawdown.recovery) {
                (Some(t), Some(r)) => Some((r - t).num_days()),
                _ => None,
            },
            mar_ratio,
        }
    }
}

struct DrawdownWindow {
    max_drawdown: f64,
    peak: Option<NaiveDate>,
    trough: Option<NaiveDate>,
    recovery: Option<NaiveDate>,
}

fn max_drawdown_window(daily: &[DailyPerformance]) -> DrawdownWindow {
    let mut window = DrawdownWindow {
        max_drawdown: 0.0,
        peak: None,
        trough: None,
        recovery: None,
    };
    let Some(first) = daily.first() else {
        return window;
    };

    let mut peak_equity = first.equity;
    let mut peak_date = first.date;
    let mut worst_peak_equity = first.equity;

    for row in daily {
        if row.equity > peak_equity {
            peak_equity = row.equity;
            peak_date = row.date;
        }
        let dd = if peak_equity > 0.0 {
            row.equity / peak_equity - 1.0
        } else {
            0.0
        };
        if dd < window.max_drawdown {
            window.max_drawdown = dd;
            window.peak = Some(peak_date);
            window.trough = Some(row.date);
            worst_peak_equity = peak_equity;
        }
    }

    if let Some(trough) = window.trough {
        window.recovery = daily
            .iter()
            .find(|row| row.date > trough && row.equity >= worst_peak_equity)
            .map(|row| row.date);
    }

    window
}
