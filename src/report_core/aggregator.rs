//! Sums period volumes across trades into one UTC-stamped record per period

use super::bucket::BucketMapper;
use super::trade::{AggregateRecord, PeriodViolation, PowerTrade, REPORT_DATETIME_FORMAT};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// Trade `trade_index` has non-dense or repeated period indices
    InconsistentPeriods {
        trade_index: usize,
        violation: PeriodViolation,
    },
    /// `mismatched` trades were issued for another day than the one requested;
    /// `trade_index` is the first of them
    DateMismatch {
        trade_index: usize,
        mismatched: usize,
        expected: NaiveDate,
        actual: NaiveDate,
    },
}

impl std::fmt::Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::InconsistentPeriods { trade_index, violation } => {
                write!(f, "Trade #{} has inconsistent periods: {}", trade_index, violation)
            }
            AggregationError::DateMismatch {
                trade_index,
                mismatched,
                expected,
                actual,
            } => write!(
                f,
                "{} trade(s) not for trading date {}, first is #{} for {}",
                mismatched, expected, trade_index, actual
            ),
        }
    }
}

impl std::error::Error for AggregationError {}

/// Stateless aggregation engine bound to the trader's timezone
#[derive(Debug, Clone, Copy)]
pub struct TradeAggregator {
    mapper: BucketMapper,
}

impl TradeAggregator {
    pub fn new(tz: Tz) -> Self {
        Self {
            mapper: BucketMapper::new(tz),
        }
    }

    pub fn mapper(&self) -> &BucketMapper {
        &self.mapper
    }

    /// Aggregate `trades` for `trading_date`.
    ///
    /// One record per distinct period index, ascending. A record's timestamp is
    /// fixed when its period is first seen; later trades only add volume.
    /// Empty input yields an empty report. Trades for any other day reject the
    /// whole batch.
    pub fn aggregate(
        &self,
        trades: &[PowerTrade],
        trading_date: NaiveDate,
    ) -> Result<Vec<AggregateRecord>, AggregationError> {
        let mut off_day = trades
            .iter()
            .enumerate()
            .filter(|(_, trade)| trade.date != trading_date);
        if let Some((trade_index, first)) = off_day.next() {
            let mismatched = 1 + off_day.count();
            log::warn!(
                "⚠️  {} of {} trades are not for trading date {} (first: #{} for {})",
                mismatched,
                trades.len(),
                trading_date,
                trade_index,
                first.date
            );
            return Err(AggregationError::DateMismatch {
                trade_index,
                mismatched,
                expected: trading_date,
                actual: first.date,
            });
        }

        let anchor = self.mapper.first_bucket(trading_date);
        let mut by_period: BTreeMap<u32, AggregateRecord> = BTreeMap::new();

        for (trade_index, trade) in trades.iter().enumerate() {
            trade
                .validate()
                .map_err(|violation| AggregationError::InconsistentPeriods {
                    trade_index,
                    violation,
                })?;

            for period in &trade.periods {
                by_period
                    .entry(period.period)
                    .and_modify(|record| record.volume += period.volume)
                    .or_insert_with(|| AggregateRecord {
                        period: period.period,
                        datetime: anchor
                            .instant(period.period)
                            .format(REPORT_DATETIME_FORMAT)
                            .to_string(),
                        volume: period.volume,
                    });
            }
        }

        Ok(by_period.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report_core::trade::PowerPeriod;
    use chrono_tz::{America, Europe};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    fn london() -> TradeAggregator {
        TradeAggregator::new(Europe::London)
    }

    #[test]
    fn test_two_trades_three_periods() {
        let trades = vec![
            PowerTrade::with_volumes(day(), &[1.1, 2.2, 3.3]),
            PowerTrade::with_volumes(day(), &[1.1, 2.2, 3.3]),
        ];

        let records = london().aggregate(&trades, day()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].volume, 2.2);
        assert_eq!(records[1].volume, 4.4);
        assert_eq!(records[2].volume, 6.6);
    }

    #[test]
    fn test_three_trades_sum_first_period() {
        let trades = vec![
            PowerTrade::with_volumes(day(), &[1.1]),
            PowerTrade::with_volumes(day(), &[1.1]),
            PowerTrade::with_volumes(day(), &[1.1]),
        ];

        let records = london().aggregate(&trades, day()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].volume, 1.1 + 1.1 + 1.1);
        assert!((records[0].volume - 3.3).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_empty_report() {
        let records = london().aggregate(&[], day()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_output_sorted_regardless_of_insertion_order() {
        let reversed = PowerTrade {
            date: day(),
            periods: vec![
                PowerPeriod::new(3, 30.0),
                PowerPeriod::new(2, 20.0),
                PowerPeriod::new(1, 10.0),
            ],
        };
        let longer = PowerTrade::with_volumes(day(), &[1.0, 1.0, 1.0, 1.0]);

        let records = london().aggregate(&[reversed, longer], day()).unwrap();

        let periods: Vec<u32> = records.iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![1, 2, 3, 4]);
        assert_eq!(records[0].volume, 11.0);
        assert_eq!(records[3].volume, 1.0);
    }

    #[test]
    fn test_timestamps_follow_bucket_mapper() {
        let trades = vec![PowerTrade::with_volumes(day(), &[1.0, 1.0, 1.0])];

        let london = london().aggregate(&trades, day()).unwrap();
        assert_eq!(london[0].datetime, "2021-01-01T00:00:00Z");
        assert_eq!(london[2].datetime, "2021-01-01T02:00:00Z");

        let new_york = TradeAggregator::new(America::New_York)
            .aggregate(&trades, day())
            .unwrap();
        assert_eq!(new_york[0].datetime, "2021-01-02T05:00:00Z");
        assert_eq!(new_york[2].datetime, "2021-01-02T03:00:00Z");
    }

    #[test]
    fn test_repeated_aggregation_is_identical() {
        let trades = vec![
            PowerTrade::with_volumes(day(), &[0.1, -7.25, 3.0]),
            PowerTrade::with_volumes(day(), &[100.0, 0.3, -3.0]),
        ];
        let aggregator = london();

        let first = aggregator.aggregate(&trades, day()).unwrap();
        let second = aggregator.aggregate(&trades, day()).unwrap();

        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.volume.to_bits(), b.volume.to_bits());
        }
    }

    #[test]
    fn test_malformed_trade_is_rejected() {
        let broken = PowerTrade {
            date: day(),
            periods: vec![PowerPeriod::new(1, 1.0), PowerPeriod::new(1, 1.0)],
        };
        let ok = PowerTrade::with_volumes(day(), &[1.0, 1.0]);

        let err = london().aggregate(&[ok, broken], day()).unwrap_err();
        assert!(matches!(err, AggregationError::InconsistentPeriods { trade_index: 1, .. }));
    }

    #[test]
    fn test_trade_for_other_day_is_rejected() {
        let other = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let trades = vec![PowerTrade::with_volumes(other, &[1.0])];

        let err = london().aggregate(&trades, day()).unwrap_err();
        assert!(matches!(err, AggregationError::DateMismatch { .. }));
    }

    #[test]
    fn test_date_mismatch_reports_first_index_and_count() {
        let other = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        let trades = vec![
            PowerTrade::with_volumes(day(), &[1.0]),
            PowerTrade::with_volumes(other, &[1.0]),
            PowerTrade::with_volumes(day(), &[1.0]),
            PowerTrade::with_volumes(other, &[1.0]),
        ];

        let err = london().aggregate(&trades, day()).unwrap_err();

        assert_eq!(
            err,
            AggregationError::DateMismatch {
                trade_index: 1,
                mismatched: 2,
                expected: day(),
                actual: other,
            }
        );
        assert_eq!(
            err.to_string(),
            "2 trade(s) not for trading date 2021-01-01, first is #1 for 2020-12-31"
        );
    }
}
