//! Domain error types.

/// Top-level error type for rsitrader.
#[derive(Debug, thiserror::Error)]
pub enum RsiTraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data access error: {reason}")]
    DataAccess { reason: String },

    #[error("malformed data in {path} (row {row}): {reason}")]
    DataFormat {
        path: String,
        row: usize,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("failed to write report {path}: {reason}")]
    ReportWrite { path: String, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RsiTraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RsiTraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        RsiTraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&RsiTraderError> for std::process::ExitCode {
    fn from(err: &RsiTraderError) -> Self {
        let code: u8 = match err {
            RsiTraderError::Io(_) | RsiTraderError::ReportWrite { .. } => 1,
            RsiTraderError::ConfigParse { .. }
            | RsiTraderError::ConfigMissing { .. }
            | RsiTraderError::ConfigInvalid { .. } => 2,
            RsiTraderError::DataAccess { .. }
            | RsiTraderError::DataFormat { .. }
            | RsiTraderError::Csv(_) => 3,
            RsiTraderError::NoData { .. } | RsiTraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
