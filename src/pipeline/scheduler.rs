//! Report scheduler - fetch, aggregate and write one report per interval
//!
//! Each tick runs the unit of work until it succeeds or the attempt budget is
//! spent, waiting a fixed delay between attempts:
//!
//! ```text
//! Idle → Running ─ok──→ Succeeded → Idle
//!           │
//!           └─err─→ Retrying ─(delay)─→ Running
//!                └→ Exhausted → Idle
//! ```
//!
//! A failed tick is logged and absorbed; the loop always moves on to the next
//! interval.

use super::clock::{Clock, Sleeper};
use super::retry::{RetryDecision, RunAttempt};
use crate::config::{ReportConfig, TradingDateMode};
use crate::provider::{ProviderError, TradeProvider};
use crate::report_core::{AggregationError, PowerTrade, ReportWriter, ReportWriterError, TradeAggregator};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    Idle,
    Running,
    Succeeded,
    Retrying,
    Exhausted,
}

/// Any failure inside one attempt. All variants take the same retry path.
#[derive(Debug)]
pub enum TickError {
    /// The configured offset moves the trading date off the calendar
    TradingDate { run_time: DateTime<Utc> },
    Provider(ProviderError),
    Aggregation(AggregationError),
    Write(ReportWriterError),
}

impl From<ProviderError> for TickError {
    fn from(err: ProviderError) -> Self {
        TickError::Provider(err)
    }
}

impl From<AggregationError> for TickError {
    fn from(err: AggregationError) -> Self {
        TickError::Aggregation(err)
    }
}

impl From<ReportWriterError> for TickError {
    fn from(err: ReportWriterError) -> Self {
        TickError::Write(err)
    }
}

impl std::fmt::Display for TickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickError::TradingDate { run_time } => {
                write!(f, "trading date out of range for run at {}", run_time)
            }
            TickError::Provider(e) => write!(f, "fetch failed: {}", e),
            TickError::Aggregation(e) => write!(f, "aggregation failed: {}", e),
            TickError::Write(e) => write!(f, "report write failed: {}", e),
        }
    }
}

impl std::error::Error for TickError {}

/// Result of one scheduled tick
#[derive(Debug)]
pub enum TickOutcome {
    Succeeded {
        path: PathBuf,
        attempts: u32,
        failures: Vec<String>,
    },
    Exhausted {
        attempts: u32,
        failures: Vec<String>,
    },
}

impl TickOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TickOutcome::Succeeded { .. })
    }

    pub fn failures(&self) -> &[String] {
        match self {
            TickOutcome::Succeeded { failures, .. } | TickOutcome::Exhausted { failures, .. } => failures,
        }
    }
}

/// Collaborators of the scheduler, passed in explicitly
pub struct SchedulerDeps {
    pub provider: Arc<dyn TradeProvider>,
    pub aggregator: TradeAggregator,
    pub writer: Arc<dyn ReportWriter>,
    pub clock: Arc<dyn Clock>,
    pub sleeper: Arc<dyn Sleeper>,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub output_folder: PathBuf,
    pub interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub fetch_timeout: Option<Duration>,
    pub trading_date_mode: TradingDateMode,
}

impl From<&ReportConfig> for SchedulerSettings {
    fn from(config: &ReportConfig) -> Self {
        Self {
            output_folder: config.output_folder.clone(),
            interval: config.interval,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            fetch_timeout: config.fetch_timeout,
            trading_date_mode: config.trading_date_mode,
        }
    }
}

/// `PowerPosition_{YYYYMMDD}_{HHmm}.csv` under `folder`, run time in UTC
pub fn report_path(folder: &Path, trading_date: NaiveDate, run_time: DateTime<Utc>) -> PathBuf {
    folder.join(format!(
        "PowerPosition_{}_{}.csv",
        trading_date.format("%Y%m%d"),
        run_time.format("%H%M")
    ))
}

fn transition(from: TickState, to: TickState) {
    log::debug!("🔁 Tick state {:?} → {:?}", from, to);
}

pub struct ReportScheduler {
    deps: SchedulerDeps,
    settings: SchedulerSettings,
}

impl ReportScheduler {
    pub fn new(deps: SchedulerDeps, settings: SchedulerSettings) -> Self {
        Self { deps, settings }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    async fn fetch(&self, trading_date: NaiveDate) -> Result<Vec<PowerTrade>, ProviderError> {
        let request = self.deps.provider.fetch_trades(trading_date);
        match self.settings.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(limit)),
            },
            None => request.await,
        }
    }

    /// One attempt: fetch → aggregate → write. Returns the written path.
    async fn generate_report(&self) -> Result<PathBuf, TickError> {
        let run_time = self.deps.clock.now();
        let tz = self.deps.aggregator.mapper().timezone();
        let trading_date = self
            .settings
            .trading_date_mode
            .resolve(run_time, tz)
            .ok_or(TickError::TradingDate { run_time })?;

        let trades = self.fetch(trading_date).await?;
        let records = self.deps.aggregator.aggregate(&trades, trading_date)?;

        let path = report_path(&self.settings.output_folder, trading_date, run_time);
        self.deps.writer.write_report(&records, &path)?;

        log::debug!(
            "📊 {} trades → {} periods for {}",
            trades.len(),
            records.len(),
            trading_date
        );
        Ok(path)
    }

    /// Run one tick to success or exhaustion. Never returns an error.
    pub async fn run_tick(&self) -> TickOutcome {
        let mut attempt = RunAttempt::new(self.settings.max_retries);
        let mut failures = Vec::new();
        let mut state = TickState::Idle;

        loop {
            transition(state, TickState::Running);
            state = TickState::Running;

            match self.generate_report().await {
                Ok(path) => {
                    transition(state, TickState::Succeeded);
                    log::info!("✅ Report generated and saved to: {}", path.display());
                    transition(TickState::Succeeded, TickState::Idle);
                    return TickOutcome::Succeeded {
                        path,
                        attempts: attempt.number(),
                        failures,
                    };
                }
                Err(e) => {
                    log::error!(
                        "❌ Failed to generate and save report on attempt {}/{}: {}",
                        attempt.number(),
                        attempt.max_attempts(),
                        e
                    );
                    failures.push(e.to_string());

                    match attempt.record_failure() {
                        RetryDecision::Retry => {
                            transition(state, TickState::Retrying);
                            state = TickState::Retrying;
                            log::warn!(
                                "⏳ Retrying in {}s",
                                self.settings.retry_delay.as_secs_f64()
                            );
                            self.deps.sleeper.sleep(self.settings.retry_delay).await;
                        }
                        RetryDecision::Exhausted => {
                            transition(state, TickState::Exhausted);
                            log::error!(
                                "❌ All {} attempts failed; no report will be produced for this interval",
                                attempt.max_attempts()
                            );
                            transition(TickState::Exhausted, TickState::Idle);
                            return TickOutcome::Exhausted {
                                attempts: attempt.attempt(),
                                failures,
                            };
                        }
                    }
                }
            }
        }
    }

    async fn tick_and_wait(&self) -> TickOutcome {
        let outcome = self.run_tick().await;
        self.deps.sleeper.sleep(self.settings.interval).await;
        outcome
    }

    /// Run `count` ticks back to back, each followed by the interval wait
    pub async fn run_ticks(&self, count: usize) -> Vec<TickOutcome> {
        let mut outcomes = Vec::with_capacity(count);
        for _ in 0..count {
            outcomes.push(self.tick_and_wait().await);
        }
        outcomes
    }

    /// This function runs indefinitely until the process is stopped.
    pub async fn run_forever(&self) {
        log::info!(
            "⏰ Starting report scheduler (interval: {}s, max attempts: {}, retry delay: {}s)",
            self.settings.interval.as_secs(),
            self.settings.max_retries.max(1),
            self.settings.retry_delay.as_secs()
        );
        log::info!("   ├─ Provider: {}", self.deps.provider.provider_name());
        log::info!("   ├─ Writer: {}", self.deps.writer.backend_type());
        log::info!("   └─ Output: {}", self.settings.output_folder.display());

        loop {
            self.tick_and_wait().await;
        }
    }
}
