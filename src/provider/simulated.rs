//! In-process stand-in for the power trading system.
//!
//! Produces a random set of trades with one period per local hour of the
//! trading day (23 or 25 on clock-change days), fails at a configurable rate
//! and answers after a random delay.

use super::{ProviderError, TradeProvider};
use crate::report_core::{PowerPeriod, PowerTrade};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use rand::Rng;
use std::time::Duration;

const DEFAULT_HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone)]
pub struct SimulatedPowerService {
    tz: Tz,
    failure_rate: f64,
    max_latency: Duration,
    max_trades: u32,
}

impl SimulatedPowerService {
    pub fn new(tz: Tz, failure_rate: f64) -> Self {
        Self {
            tz,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            max_latency: Duration::from_millis(500),
            max_trades: 5,
        }
    }

    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }

    pub fn with_max_trades(mut self, max_trades: u32) -> Self {
        self.max_trades = max_trades.max(1);
        self
    }

    /// Number of hourly periods in `date` as lived in the provider's timezone
    pub fn periods_in_day(&self, date: NaiveDate) -> u32 {
        let Some(next) = date.succ_opt() else {
            return DEFAULT_HOURS_PER_DAY;
        };
        let start = self.tz.from_local_datetime(&date.and_time(NaiveTime::MIN)).earliest();
        let end = self.tz.from_local_datetime(&next.and_time(NaiveTime::MIN)).earliest();

        match (start, end) {
            (Some(start), Some(end)) => u32::try_from((end - start).num_hours())
                .unwrap_or(DEFAULT_HOURS_PER_DAY),
            _ => DEFAULT_HOURS_PER_DAY,
        }
    }

    fn generate(&self, date: NaiveDate) -> (Duration, Result<Vec<PowerTrade>, ProviderError>) {
        let mut rng = rand::thread_rng();
        let max_ms = self.max_latency.as_millis() as u64;
        let latency = Duration::from_millis(if max_ms == 0 { 0 } else { rng.gen_range(0..=max_ms) });

        if rng.gen_bool(self.failure_rate) {
            return (
                latency,
                Err(ProviderError::Unavailable("Error retrieving power volumes".to_string())),
            );
        }

        let periods = self.periods_in_day(date);
        let trade_count = rng.gen_range(1..=self.max_trades);
        let trades = (0..trade_count)
            .map(|_| PowerTrade {
                date,
                periods: (1..=periods)
                    .map(|p| {
                        let volume: f64 = rng.gen_range(-500.0..500.0);
                        PowerPeriod::new(p, (volume * 100.0).round() / 100.0)
                    })
                    .collect(),
            })
            .collect();

        (latency, Ok(trades))
    }
}

#[async_trait]
impl TradeProvider for SimulatedPowerService {
    async fn fetch_trades(&self, date: NaiveDate) -> Result<Vec<PowerTrade>, ProviderError> {
        let (latency, result) = self.generate(date);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match &result {
            Ok(trades) => log::debug!("📥 Simulated {} trades for {}", trades.len(), date),
            Err(e) => log::debug!("⚠️  Simulated provider failure for {}: {}", date, e),
        }
        result
    }

    fn provider_name(&self) -> &'static str {
        "simulated"
    }
}
