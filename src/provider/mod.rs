//! Trade data providers
//!
//! The scheduler only depends on [`TradeProvider`]; every failure a provider
//! reports is retried the same way.

pub mod http;
pub mod simulated;

use crate::report_core::PowerTrade;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

pub use http::HttpTradeProvider;
pub use simulated::SimulatedPowerService;

#[derive(Debug)]
pub enum ProviderError {
    /// Provider refused or failed to produce trades
    Unavailable(String),
    Http(reqwest::Error),
    /// No answer within the configured fetch timeout
    Timeout(Duration),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Unavailable(msg) => write!(f, "Trade provider unavailable: {}", msg),
            ProviderError::Http(e) => write!(f, "HTTP error: {}", e),
            ProviderError::Timeout(d) => write!(f, "Trade fetch timed out after {}s", d.as_secs_f64()),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Source of all trades for one trading day
#[async_trait]
pub trait TradeProvider: Send + Sync {
    async fn fetch_trades(&self, date: NaiveDate) -> Result<Vec<PowerTrade>, ProviderError>;

    /// Get provider name for logging
    fn provider_name(&self) -> &'static str;
}
