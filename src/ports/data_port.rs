//! Price data access port trait.

use crate::domain::error::RsiTraderError;
use crate::domain::ohlcv::PriceBar;
use chrono::{NaiveDate, NaiveDateTime};

pub trait DataPort {
    /// Bars for `symbol` whose trading day lies in `[start_date, end_date]`,
    /// sorted by timestamp.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RsiTraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, RsiTraderError>;

    /// First timestamp, last timestamp and bar count, or `None` when empty.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RsiTraderError>;
}
