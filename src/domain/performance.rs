//! Daily performance series derived from the intraday equity curve.

use chrono::NaiveDate;

use super::portfolio::EquityPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub cash: f64,
    pub equity: f64,
    /// Fractional change from the previous day, 0 on the first day.
    pub daily_return: f64,
    pub cumulative_return: f64,
    /// `equity / running_peak - 1`, never positive.
    pub drawdown: f64,
}

/// Last equity point of each calendar day, with days that have no point
/// carrying the previous day forward.
pub fn compute_daily_performance(equity_curve: &[EquityPoint]) -> Vec<DailyPerformance> {
    let mut closes: Vec<(NaiveDate, f64, f64)> = Vec::new();
    for point in equity_curve {
        let date = point.timestamp.date();
        match closes.last_mut() {
            Some(last) if last.0 == date => {
                last.1 = point.cash;
                last.2 = point.equity;
            }
            _ => closes.push((date, point.cash, point.equity)),
        }
    }

    let Some(&(first_date, _, first_equity)) = closes.first() else {
        return Vec::new();
    };

    let mut rows = Vec::with_capacity(closes.len());
    let mut peak = first_equity;
    let mut prev_equity = first_equity;
    let mut date = first_date;
    let mut current = (closes[0].1, closes[0].2);
    let mut next = closes.iter().peekable();

    let last_date = closes[closes.len() - 1].0;
    while date <= last_date {
        if next.peek().is_some_and(|c| c.0 == date) {
            if let Some(&(_, cash, equity)) = next.next() {
                current = (cash, equity);
            }
        }
        let (cash, equity) = current;

        peak = peak.max(equity);
        let daily_return = if rows.is_empty() || prev_equity == 0.0 {
            0.0
        } else {
            equity / prev_equity - 1.0
        };
        let cumulative_return = if first_equity != 0.0 {
            equity / first_equity - 1.0
        } else {
            0.0
        };
        let drawdown = if peak > 0.0 { equity / peak - 1.0 } else { 0.0 };

        rows.push(DailyPerformance {
            date,
            cash,
            equity,
            daily_return,
            cumulative_return,
            drawdown,
        });

        prev_equity = equity;
        let Some(following) = date.succ_opt() else {
            break;
        };
        date = following;
    }

    rows
}
