//! Configuration validation.
//!
//! Checks every config field before a run, and hosts the small parsers the
//! config builders share.

use crate::domain::error::RsiTraderError;
use crate::domain::resample::ResamplePeriod;
use crate::domain::strategy::{BbRule, OrderEntry};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    match config.get_string("data", "base_dir") {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(RsiTraderError::missing("data", "base_dir")),
    }
    let bars_per_day = read_number::<i64>(config, "data", "bars_per_day")?.unwrap_or(1440);
    if bars_per_day < 1 {
        return Err(RsiTraderError::invalid(
            "data",
            "bars_per_day",
            "bars_per_day must be at least 1",
        ));
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    validate_initial_capital(config)?;
    validate_fees(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_symbols(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    let rsi_period = read_number::<i64>(config, "strategy", "rsi_period")?.unwrap_or(14);
    if rsi_period < 1 {
        return Err(RsiTraderError::invalid(
            "strategy",
            "rsi_period",
            "rsi_period must be at least 1",
        ));
    }

    let threshold = read_number::<f64>(config, "strategy", "rsi_threshold")?.unwrap_or(30.0);
    check_rsi_threshold(threshold, "strategy", "rsi_threshold")?;

    let stop = read_number::<f64>(config, "strategy", "trailing_stop_pct")?.unwrap_or(0.02);
    validate_trailing_stop(stop, "strategy")?;

    if let Some(raw) = config.get_string("strategy", "ma_days") {
        parse_ma_days(&raw).map_err(|e| RsiTraderError::invalid("strategy", "ma_days", e))?;
    }

    if let Some(raw) = config.get_string("strategy", "order_entry") {
        raw.parse::<OrderEntry>()
            .map_err(|e| RsiTraderError::invalid("strategy", "order_entry", e))?;
    }

    if config.get_bool("strategy", "use_bbands", false) {
        let window = read_number::<i64>(config, "strategy", "bb_window")?.unwrap_or(20);
        check_bb_window(window, "strategy", "bb_window")?;
        let num_std = read_number::<f64>(config, "strategy", "bb_num_std")?.unwrap_or(2.0);
        check_bb_num_std(num_std, "strategy", "bb_num_std")?;
        if let Some(raw) = config.get_string("strategy", "bb_rule") {
            raw.parse::<BbRule>()
                .map_err(|e| RsiTraderError::invalid("strategy", "bb_rule", e))?;
        }
    }
    Ok(())
}

/// Checks every `[sweep]` grid list parses and is non-empty when present.
pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    if let Some(raw) = config.get_string("sweep", "ticker_sets") {
        parse_ticker_sets(&raw).map_err(|e| RsiTraderError::invalid("sweep", "ticker_sets", e))?;
    }
    if let Some(raw) = config.get_string("sweep", "ma_sets") {
        parse_ma_sets(&raw).map_err(|e| RsiTraderError::invalid("sweep", "ma_sets", e))?;
    }
    if let Some(raw) = config.get_string("sweep", "rsi_periods") {
        let periods = parse_list::<usize>(&raw)
            .map_err(|e| RsiTraderError::invalid("sweep", "rsi_periods", e))?;
        if periods.contains(&0) {
            return Err(RsiTraderError::invalid("sweep", "rsi_periods", "values must be positive"));
        }
    }
    if let Some(raw) = config.get_string("sweep", "bb_windows") {
        let windows = parse_list::<i64>(&raw)
            .map_err(|e| RsiTraderError::invalid("sweep", "bb_windows", e))?;
        for window in windows {
            check_bb_window(window, "sweep", "bb_windows")?;
        }
    }
    if let Some(raw) = config.get_string("sweep", "rsi_thresholds") {
        let thresholds = parse_list::<f64>(&raw)
            .map_err(|e| RsiTraderError::invalid("sweep", "rsi_thresholds", e))?;
        for threshold in thresholds {
            check_rsi_threshold(threshold, "sweep", "rsi_thresholds")?;
        }
    }
    if let Some(raw) = config.get_string("sweep", "trailing_stops") {
        let stops = parse_list::<f64>(&raw)
            .map_err(|e| RsiTraderError::invalid("sweep", "trailing_stops", e))?;
        for stop in stops {
            validate_trailing_stop(stop, "sweep")?;
        }
    }
    if let Some(raw) = config.get_string("sweep", "order_entries") {
        parse_list::<OrderEntry>(&raw)
            .map_err(|e| RsiTraderError::invalid("sweep", "order_entries", e))?;
    }
    if let Some(raw) = config.get_string("sweep", "bb_rules") {
        parse_list::<BbRule>(&raw).map_err(|e| RsiTraderError::invalid("sweep", "bb_rules", e))?;
    }
    if let Some(raw) = config.get_string("sweep", "bb_num_stds") {
        let num_stds = parse_list::<f64>(&raw)
            .map_err(|e| RsiTraderError::invalid("sweep", "bb_num_stds", e))?;
        for num_std in num_stds {
            check_bb_num_std(num_std, "sweep", "bb_num_stds")?;
        }
    }
    for key in ["use_bbands", "trading_fees"] {
        if let Some(raw) = config.get_string("sweep", key) {
            parse_bool_list(&raw).map_err(|e| RsiTraderError::invalid("sweep", key, e))?;
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    let Some(value) = read_number::<f64>(config, "backtest", "initial_capital")? else {
        return Ok(());
    };
    if value <= 0.0 {
        return Err(RsiTraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_fees(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    for key in ["taker_fee", "maker_fee"] {
        if let Some(value) = read_number::<f64>(config, "backtest", key)? {
            if !(0.0..1.0).contains(&value) {
                return Err(RsiTraderError::invalid(
                    "backtest",
                    key,
                    format!("{key} must be a fraction between 0 and 1"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    let value = read_number::<f64>(config, "backtest", "risk_free_rate")?.unwrap_or(0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(RsiTraderError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(RsiTraderError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), RsiTraderError> {
    match config.get_string("backtest", "symbols") {
        Some(s) if !s.trim().is_empty() => parse_symbols(&s)
            .map(|_| ())
            .map_err(|e| RsiTraderError::invalid("backtest", "symbols", e.to_string())),
        _ => Err(RsiTraderError::missing("backtest", "symbols")),
    }
}

fn validate_trailing_stop(value: f64, section: &str) -> Result<(), RsiTraderError> {
    if value <= 0.0 || value >= 1.0 {
        let key = if section == "sweep" { "trailing_stops" } else { "trailing_stop_pct" };
        return Err(RsiTraderError::invalid(
            section,
            key,
            "trailing stop must be a fraction between 0 and 1",
        ));
    }
    Ok(())
}

fn check_rsi_threshold(value: f64, section: &str, key: &str) -> Result<(), RsiTraderError> {
    if value <= 0.0 || value >= 100.0 {
        return Err(RsiTraderError::invalid(
            section,
            key,
            "rsi_threshold must be between 0 and 100",
        ));
    }
    Ok(())
}

fn check_bb_window(value: i64, section: &str, key: &str) -> Result<(), RsiTraderError> {
    if value < 2 {
        return Err(RsiTraderError::invalid(section, key, "bb_window must be at least 2"));
    }
    Ok(())
}

/// Band multipliers are keyed in hundredths, so finer values are rejected.
fn check_bb_num_std(value: f64, section: &str, key: &str) -> Result<(), RsiTraderError> {
    if value <= 0.0 {
        return Err(RsiTraderError::invalid(section, key, "bb_num_std must be positive"));
    }
    let hundredths = value * 100.0;
    if (hundredths - hundredths.round()).abs() > 1e-6 {
        return Err(RsiTraderError::invalid(
            section,
            key,
            "bb_num_std supports at most two decimal places",
        ));
    }
    Ok(())
}

/// Parse a `[backtest]` date in `YYYY-MM-DD` form.
pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, RsiTraderError> {
    match value {
        None => Err(RsiTraderError::missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            RsiTraderError::invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

/// Read an optional number, rejecting values that are present but unparsable.
pub fn read_number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, RsiTraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RsiTraderError::invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

/// Comma-separated values, each trimmed and parsed.
pub fn parse_list<T>(raw: &str) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let values = raw
        .split(',')
        .map(|token| {
            let token = token.trim();
            if token.is_empty() {
                return Err("empty value in list".to_string());
            }
            token.parse::<T>().map_err(|e| format!("'{token}': {e}"))
        })
        .collect::<Result<Vec<T>, String>>()?;
    Ok(values)
}

pub fn parse_bool_list(raw: &str) -> Result<Vec<bool>, String> {
    raw.split(',')
        .map(|token| match token.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(format!("'{other}' is not a boolean")),
        })
        .collect()
}

/// Moving-average lengths in days. `0` or an empty string means no filter.
pub fn parse_ma_days(raw: &str) -> Result<Vec<usize>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "0" {
        return Ok(Vec::new());
    }
    let days = parse_list::<usize>(trimmed)?;
    if days.contains(&0) {
        return Err("moving-average lengths must be positive".to_string());
    }
    Ok(days)
}

/// `|`-separated sets of moving-average lengths, e.g. `0 | 7 | 7,14,28`.
/// `;` cannot be used since INI treats it as a comment.
pub fn parse_ma_sets(raw: &str) -> Result<Vec<Vec<usize>>, String> {
    raw.split('|').map(parse_ma_days).collect()
}

/// `|`-separated symbol sets, e.g. `BTC-USD | BTC-USD,ETH-USD`.
pub fn parse_ticker_sets(raw: &str) -> Result<Vec<Vec<String>>, String> {
    raw.split('|')
        .map(|set| parse_symbols(set).map_err(|e| e.to_string()))
        .collect()
}

pub fn parse_resample_periods(raw: &str) -> Result<Vec<ResamplePeriod>, String> {
    parse_list::<ResamplePeriod>(raw)
}
