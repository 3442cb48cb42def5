//! Core domain types and logic.

pub mod ohlcv;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod indicator;
pub mod indicator_helpers;
pub mod signal;
pub mod backtest;
pub mod performance;
pub mod metrics;
pub mod strategy;
pub mod universe;
pub mod asset_data;
pub mod config_validation;
pub mod pipeline;
pub mod sweep;
pub mod resample;
pub mod error;
