//! Power trade model as returned by the trade provider, and the per-period
//! aggregate record written to the report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Timestamp format of the report's `datetime` column
pub const REPORT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One time slot of a trade. `period` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerPeriod {
    pub period: u32,
    pub volume: f64,
}

impl PowerPeriod {
    pub fn new(period: u32, volume: f64) -> Self {
        Self { period, volume }
    }
}

/// A single traded position for one trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerTrade {
    pub date: NaiveDate,
    pub periods: Vec<PowerPeriod>,
}

/// Reason a trade's period list is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodViolation {
    /// Index is zero or larger than the period count
    OutOfRange { period: u32, count: usize },
    /// Same index appears more than once
    Duplicate { period: u32 },
}

impl std::fmt::Display for PeriodViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodViolation::OutOfRange { period, count } => {
                write!(f, "period {} outside 1..={}", period, count)
            }
            PeriodViolation::Duplicate { period } => write!(f, "period {} appears twice", period),
        }
    }
}

impl PowerTrade {
    /// Trade with `count` periods numbered `1..=count`, all at zero volume
    pub fn create(date: NaiveDate, count: u32) -> Self {
        Self {
            date,
            periods: (1..=count).map(|p| PowerPeriod::new(p, 0.0)).collect(),
        }
    }

    pub fn with_volumes(date: NaiveDate, volumes: &[f64]) -> Self {
        Self {
            date,
            periods: volumes
                .iter()
                .enumerate()
                .map(|(i, v)| PowerPeriod::new(i as u32 + 1, *v))
                .collect(),
        }
    }

    /// Check that period indices are dense `1..=n` with no repeats.
    /// Order within the vector is not significant.
    pub fn validate(&self) -> Result<(), PeriodViolation> {
        let count = self.periods.len();
        let mut seen = vec![false; count];

        for p in &self.periods {
            let idx = p.period as usize;
            if idx == 0 || idx > count {
                return Err(PeriodViolation::OutOfRange { period: p.period, count });
            }
            if seen[idx - 1] {
                return Err(PeriodViolation::Duplicate { period: p.period });
            }
            seen[idx - 1] = true;
        }

        Ok(())
    }
}

/// Summed volume of one period across all trades of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub period: u32,
    pub datetime: String,
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    #[test]
    fn test_create_numbers_periods_from_one() {
        let trade = PowerTrade::create(day(), 24);
        assert_eq!(trade.periods.len(), 24);
        assert_eq!(trade.periods[0].period, 1);
        assert_eq!(trade.periods[23].period, 24);
        assert!(trade.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_unordered_dense_periods() {
        let trade = PowerTrade {
            date: day(),
            periods: vec![
                PowerPeriod::new(3, 1.0),
                PowerPeriod::new(1, 1.0),
                PowerPeriod::new(2, 1.0),
            ],
        };
        assert!(trade.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_gaps_and_duplicates() {
        let gap = PowerTrade {
            date: day(),
            periods: vec![PowerPeriod::new(1, 1.0), PowerPeriod::new(3, 1.0)],
        };
        assert_eq!(
            gap.validate(),
            Err(PeriodViolation::OutOfRange { period: 3, count: 2 })
        );

        let dup = PowerTrade {
            date: day(),
            periods: vec![PowerPeriod::new(1, 1.0), PowerPeriod::new(1, 2.0)],
        };
        assert_eq!(dup.validate(), Err(PeriodViolation::Duplicate { period: 1 }));

        let zero = PowerTrade {
            date: day(),
            periods: vec![PowerPeriod::new(0, 1.0)],
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_parse_provider_json() {
        let json = r#"{"date":"2021-01-01","periods":[{"period":1,"volume":1.1},{"period":2,"volume":-2.5}]}"#;
        let trade: PowerTrade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.date, day());
        assert_eq!(trade.periods[1], PowerPeriod::new(2, -2.5));
    }
}
