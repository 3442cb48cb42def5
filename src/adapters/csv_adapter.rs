//! CSV file data adapter.
//!
//! Bars live at `base_dir/source/asset_class/timeframe/SYMBOL.csv`; when none
//! of the three layout keys is set the files sit directly in `base_dir`.

use crate::domain::error::RsiTraderError;
use crate::domain::ohlcv::{normalize_bars, PriceBar};
use crate::domain::resample::ResamplePeriod;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const TIMESTAMP_COLUMNS: [&str; 4] = ["timestamp", "datetime", "date", "time"];

pub struct CsvAdapter {
    root: PathBuf,
}

/// Column positions located from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

#[derive(Serialize)]
struct BarRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvAdapter {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { root: base_dir }
    }

    /// Nest `source/asset_class/timeframe` under `base_dir`, skipping unset parts.
    pub fn with_layout(
        base_dir: PathBuf,
        source: Option<&str>,
        asset_class: Option<&str>,
        timeframe: Option<&str>,
    ) -> Self {
        let mut root = base_dir;
        for part in [source, asset_class, timeframe].into_iter().flatten() {
            let part = part.trim();
            if !part.is_empty() {
                root.push(part);
            }
        }
        Self { root }
    }

    /// Build from the `[data]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RsiTraderError> {
        let base_dir = config
            .get_string("data", "base_dir")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| RsiTraderError::missing("data", "base_dir"))?;
        let source = config.get_string("data", "source");
        let asset_class = config.get_string("data", "asset_class");
        let timeframe = config.get_string("data", "timeframe");
        Ok(Self::with_layout(
            PathBuf::from(base_dir.trim()),
            source.as_deref(),
            asset_class.as_deref(),
            timeframe.as_deref(),
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{}.csv", symbol))
    }

    /// Every bar in the symbol's file, sorted and de-duplicated.
    fn read_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, RsiTraderError> {
        let path = self.csv_path(symbol);
        let display = path.display().to_string();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| RsiTraderError::DataAccess {
                reason: format!("failed to read {}: {}", display, e),
            })?;

        let columns = locate_columns(rdr.headers()?, &display)?;
        let mut bars = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let row = i + 2;
            let record = result?;
            let bad = |reason: String| RsiTraderError::DataFormat {
                path: display.clone(),
                row,
                reason,
            };
            let field = |idx: usize, name: &str| -> Result<f64, RsiTraderError> {
                let raw = record.get(idx).unwrap_or("");
                raw.parse::<f64>()
                    .map_err(|_| bad(format!("invalid {} value '{}'", name, raw)))
            };

            let raw_ts = record.get(columns.timestamp).unwrap_or("");
            let timestamp = parse_timestamp(raw_ts)
                .ok_or_else(|| bad(format!("unrecognised timestamp '{}'", raw_ts)))?;
            let volume = match columns.volume {
                Some(idx) if !record.get(idx).unwrap_or("").is_empty() => field(idx, "volume")?,
                _ => 0.0,
            };

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                timestamp,
                open: field(columns.open, "open")?,
                high: field(columns.high, "high")?,
                low: field(columns.low, "low")?,
                close: field(columns.close, "close")?,
                volume,
            });
        }

        Ok(normalize_bars(bars))
    }

    /// Write resampled bars beside the source file as `{symbol}_{suffix}.csv`.
    pub fn write_bars(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        period: ResamplePeriod,
    ) -> Result<PathBuf, RsiTraderError> {
        let path = self.root.join(format!("{}_{}.csv", symbol, period.suffix()));
        let mut wtr = csv::Writer::from_path(&path).map_err(|e| RsiTraderError::ReportWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        for bar in bars {
            wtr.serialize(BarRow {
                timestamp: bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            })?;
        }
        wtr.flush()?;
        Ok(path)
    }
}

fn locate_columns(headers: &csv::StringRecord, path: &str) -> Result<Columns, RsiTraderError> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let find = |name: &str| names.iter().position(|h| h == name);
    let require = |name: &str| {
        find(name).ok_or_else(|| RsiTraderError::DataFormat {
            path: path.to_string(),
            row: 1,
            reason: format!("missing '{}' column", name),
        })
    };

    let timestamp = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|name| find(name))
        .ok_or_else(|| RsiTraderError::DataFormat {
            path: path.to_string(),
            row: 1,
            reason: "missing timestamp column".into(),
        })?;

    Ok(Columns {
        timestamp,
        open: require("open")?,
        high: require("high")?,
        low: require("low")?,
        close: require("close")?,
        volume: find("volume"),
    })
}

/// Accepts date-times with or without seconds, `T` separators, bare dates and
/// a trailing UTC marker.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let s = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix("+00:00"))
        .unwrap_or(trimmed);

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RsiTraderError> {
        let bars = self.read_bars(symbol)?;
        Ok(bars
            .into_iter()
            .filter(|b| {
                let day = b.trading_day();
                day >= start_date && day <= end_date
            })
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RsiTraderError> {
        let entries = fs::read_dir(&self.root).map_err(|e| RsiTraderError::DataAccess {
            reason: format!("failed to read directory {}: {}", self.root.display(), e),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            if is_resampled_output(stem) {
                continue;
            }
            symbols.push(stem.to_string());
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RsiTraderError> {
        if !self.csv_path(symbol).exists() {
            return Ok(None);
        }
        let bars = self.read_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}

fn is_resampled_output(stem: &str) -> bool {
    stem.rsplit_once('_').is_some_and(|(_, suffix)| {
        [ResamplePeriod::Daily, ResamplePeriod::MonthEnd, ResamplePeriod::QuarterEnd]
            .iter()
            .any(|p| p.suffix() == suffix)
    })
}
