//! Day-ahead power position reporting.
//!
//! Fetches the next trading day's trades on a fixed interval, sums volume per
//! period across trades, stamps each period with its UTC instant and writes a
//! `PowerPosition_{YYYYMMDD}_{HHmm}.csv` report.

pub mod config;
pub mod pipeline;
pub mod provider;
pub mod report_core;

pub use config::{ConfigError, ProviderKind, ReportConfig, TradingDateMode};
