//! Period aggregation of price bars.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use super::ohlcv::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplePeriod {
    Daily,
    MonthEnd,
    QuarterEnd,
}

impl ResamplePeriod {
    /// File suffix used for resampled output (`BTC-USD_ME.csv`).
    pub fn suffix(&self) -> &'static str {
        match self {
            ResamplePeriod::Daily => "D",
            ResamplePeriod::MonthEnd => "ME",
            ResamplePeriod::QuarterEnd => "QE",
        }
    }

    /// Last calendar day of the period containing `date`.
    pub fn period_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            ResamplePeriod::Daily => date,
            ResamplePeriod::MonthEnd => month_end(date.year(), date.month()),
            ResamplePeriod::QuarterEnd => {
                let quarter_last_month = ((date.month() - 1) / 3 + 1) * 3;
                month_end(date.year(), quarter_last_month)
            }
        }
    }
}

impl fmt::Display for ResamplePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for ResamplePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" | "DAILY" => Ok(ResamplePeriod::Daily),
            "ME" | "MONTH" | "MONTHLY" => Ok(ResamplePeriod::MonthEnd),
            "QE" | "QUARTER" | "QUARTERLY" => Ok(ResamplePeriod::QuarterEnd),
            other => Err(format!("unknown period '{other}' (expected D, ME or QE)")),
        }
    }
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Aggregate time-ordered bars into one bar per period, stamped at midnight
/// of the period's last calendar day.
pub fn resample_bars(bars: &[PriceBar], period: ResamplePeriod) -> Vec<PriceBar> {
    let mut out: Vec<PriceBar> = Vec::new();
    let mut current_end: Option<NaiveDate> = None;

    for bar in bars {
        let end = period.period_end(bar.trading_day());
        match out.last_mut() {
            Some(agg) if current_end == Some(end) => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                current_end = Some(end);
                out.push(PriceBar {
                    timestamp: end.and_time(chrono::NaiveTime::MIN),
                    ..bar.clone()
                });
            }
        }
    }

    out
}
