//! Trade provider backed by an HTTP endpoint returning JSON trades
//!
//! `GET {base_url}/trades?date=YYYY-MM-DD` → `[{"date": ..., "periods": [...]}, ...]`

use super::{ProviderError, TradeProvider};
use crate::report_core::PowerTrade;
use async_trait::async_trait;
use chrono::NaiveDate;

pub struct HttpTradeProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTradeProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn trades_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/trades?date={}",
            self.base_url.trim_end_matches('/'),
            date.format("%Y-%m-%d")
        )
    }

    /// Decode a provider response body
    pub fn parse_trades(body: &str) -> Result<Vec<PowerTrade>, ProviderError> {
        serde_json::from_str(body)
            .map_err(|e| ProviderError::Unavailable(format!("Malformed trade payload: {}", e)))
    }
}

#[async_trait]
impl TradeProvider for HttpTradeProvider {
    async fn fetch_trades(&self, date: NaiveDate) -> Result<Vec<PowerTrade>, ProviderError> {
        let url = self.trades_url(date);
        log::debug!("🌐 GET {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let trades = Self::parse_trades(&body)?;
        log::debug!("📥 Received {} trades for {}", trades.len(), date);
        Ok(trades)
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}
