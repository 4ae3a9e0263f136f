//! Integration tests for the report scheduler
//!
//! Drives whole ticks through a flaky provider, the real CSV writer and a
//! temporary output folder, with the clock and sleeps replaced so no test
//! waits on wall-clock time.

#[cfg(test)]
mod report_scheduler_tests {
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use chrono_tz::Europe;
    use powerflow::config::TradingDateMode;
    use powerflow::pipeline::{Clock, ReportScheduler, SchedulerDeps, SchedulerSettings, Sleeper, TickOutcome};
    use powerflow::provider::{ProviderError, TradeProvider};
    use powerflow::report_core::{CsvReportWriter, PowerTrade, TradeAggregator};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    /// Fails the first `failures` calls, then returns two 3-period trades
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TradeProvider for FlakyProvider {
        async fn fetch_trades(&self, date: NaiveDate) -> Result<Vec<PowerTrade>, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ProviderError::Unavailable(format!("outage on call {}", call + 1)));
            }
            Ok(vec![
                PowerTrade::with_volumes(date, &[1.1, 2.2, 3.3]),
                PowerTrade::with_volumes(date, &[1.1, 2.2, 3.3]),
            ])
        }

        fn provider_name(&self) -> &'static str {
            "flaky"
        }
    }

    fn build(
        provider: Arc<FlakyProvider>,
        sleeper: Arc<RecordingSleeper>,
        output: &Path,
        max_retries: u32,
    ) -> ReportScheduler {
        ReportScheduler::new(
            SchedulerDeps {
                provider,
                aggregator: TradeAggregator::new(Europe::London),
                writer: Arc::new(CsvReportWriter::default()),
                clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2021, 1, 1, 14, 30, 0).unwrap())),
                sleeper,
            },
            SchedulerSettings {
                output_folder: output.to_path_buf(),
                interval: Duration::from_secs(60 * 60),
                max_retries,
                retry_delay: Duration::from_secs(5),
                fetch_timeout: None,
                trading_date_mode: TradingDateMode::RunDayOffset(1),
            },
        )
    }

    fn report_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FlakyProvider::new(2));
        let sleeper = Arc::new(RecordingSleeper::default());
        let scheduler = build(provider.clone(), sleeper.clone(), dir.path(), 3);

        let outcome = scheduler.run_tick().await;

        match &outcome {
            TickOutcome::Succeeded { path, attempts, failures } => {
                assert_eq!(*attempts, 3);
                assert_eq!(failures.len(), 2);
                assert_eq!(path, &dir.path().join("PowerPosition_20210102_1430.csv"));
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(provider.calls(), 3);
        assert_eq!(report_files(dir.path()), vec!["PowerPosition_20210102_1430.csv"]);
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );

        let content = fs::read_to_string(dir.path().join("PowerPosition_20210102_1430.csv")).unwrap();
        assert_eq!(
            content,
            "datetime;Volume\n\
             2021-01-02T00:00:00Z;2.2\n\
             2021-01-02T01:00:00Z;4.4\n\
             2021-01-02T02:00:00Z;6.6\n"
        );
    }

    #[tokio::test]
    async fn test_exhausted_tick_writes_nothing_and_scheduler_continues() {
        let dir = tempfile::tempdir().unwrap();
        // Three failures spend the whole first tick; the next tick succeeds
        let provider = Arc::new(FlakyProvider::new(3));
        let sleeper = Arc::new(RecordingSleeper::default());
        let scheduler = build(provider.clone(), sleeper.clone(), dir.path(), 3);

        let first = scheduler.run_tick().await;
        assert!(matches!(first, TickOutcome::Exhausted { attempts: 3, .. }));
        assert_eq!(first.failures().len(), 3);
        assert!(report_files(dir.path()).is_empty());

        let outcomes = scheduler.run_ticks(1).await;
        assert!(outcomes[0].is_success());
        assert_eq!(report_files(dir.path()).len(), 1);
        assert_eq!(provider.calls(), 4);

        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![
                Duration::from_secs(5),
                Duration::from_secs(5),
                Duration::from_secs(60 * 60),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_retries_tries_once() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FlakyProvider::new(1));
        let sleeper = Arc::new(RecordingSleeper::default());
        let scheduler = build(provider.clone(), sleeper.clone(), dir.path(), 0);

        let outcomes = scheduler.run_ticks(2).await;

        assert!(matches!(outcomes[0], TickOutcome::Exhausted { attempts: 1, .. }));
        assert!(outcomes[1].is_success());
        assert_eq!(provider.calls(), 2);
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_secs(60 * 60), Duration::from_secs(60 * 60)]
        );
    }

    #[tokio::test]
    async fn test_missing_output_folder_is_retried_then_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");
        let provider = Arc::new(FlakyProvider::new(0));
        let sleeper = Arc::new(RecordingSleeper::default());
        let scheduler = build(provider.clone(), sleeper, &missing, 2);

        let outcome = scheduler.run_tick().await;

        assert!(matches!(outcome, TickOutcome::Exhausted { attempts: 2, .. }));
        assert!(outcome.failures()[0].starts_with("report write failed"));
        assert_eq!(provider.calls(), 2);
        assert!(!missing.exists());
    }
}
