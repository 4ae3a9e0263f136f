//! Power Position Runtime
//!
//! Generates a day-ahead position report every interval until stopped.
//!
//! Usage:
//!   cargo run --release --bin power_position -- --outputPath reports/ --interval 5
//!
//! Settings come from `appsettings.json` (or `POWERFLOW_SETTINGS`), environment
//! variables and command line flags; see `powerflow::config` for the full list.
//! RUST_LOG controls verbosity (default: info).

use dotenv::dotenv;
use log::{error, info};
use powerflow::config::{ProviderKind, ReportConfig};
use powerflow::pipeline::{ReportScheduler, SchedulerDeps, SchedulerSettings, SystemClock, TokioSleeper};
use powerflow::provider::{HttpTradeProvider, SimulatedPowerService, TradeProvider};
use powerflow::report_core::{CsvReportWriter, TradeAggregator};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Starting Power Position Runtime");

    let args: Vec<String> = env::args().skip(1).collect();
    let config = match ReportConfig::load(&args).and_then(|config| {
        config.ensure_output_folder()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuration validation failed: {}", e);
            return Err(e.into());
        }
    };

    info!("📊 Configuration:");
    info!("   ├─ Output folder: {}", config.output_folder.display());
    info!("   ├─ Interval: {} min", config.interval.as_secs() / 60);
    info!("   ├─ Max retries: {}", config.max_retries);
    info!("   ├─ Trader timezone: {}", config.trader_timezone);
    info!("   └─ Trading date: {:?}", config.trading_date_mode);

    let provider: Arc<dyn TradeProvider> = match &config.provider {
        ProviderKind::Simulated { failure_rate } => {
            Arc::new(SimulatedPowerService::new(config.trader_timezone, *failure_rate))
        }
        ProviderKind::Http { base_url } => Arc::new(HttpTradeProvider::new(base_url.clone())),
    };

    let scheduler = ReportScheduler::new(
        SchedulerDeps {
            provider,
            aggregator: TradeAggregator::new(config.trader_timezone),
            writer: Arc::new(CsvReportWriter::new(config.delimiter)),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
        },
        SchedulerSettings::from(&config),
    );

    scheduler.run_forever().await;
    Ok(())
}
