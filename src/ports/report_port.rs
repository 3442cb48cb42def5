//! Report output port trait.

use std::path::Path;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::RsiTraderError;
use crate::domain::pipeline::PipelineOutput;
use crate::domain::strategy::Strategy;
use crate::domain::sweep::SweepOutcome;

/// Port for writing run artifacts and sweep results.
pub trait ReportPort {
    /// Write every artifact of one run into `dir`, creating it if needed.
    fn write_run(
        &self,
        output: &PipelineOutput,
        strategy: &Strategy,
        config: &BacktestConfig,
        dir: &Path,
    ) -> Result<(), RsiTraderError>;

    /// Append one sweep row to `path`; the header is written only when the
    /// file is new or empty.
    fn append_sweep_result(&self, outcome: &SweepOutcome, path: &Path) -> Result<(), RsiTraderError>;
}
