//! Maps trading-day periods onto UTC instants.
//!
//! Period 1 is anchored at local midnight of the trading day shifted by the
//! zone's whole-hour UTC offset on that day. Subsequent periods step one hour
//! at a time in the direction of the offset's sign:
//!
//! ```text
//! offset >= 0:  start = midnight - offset         period i = start + (i-1)h
//! offset <  0:  start = midnight + 1d - offset    period i = start - (i-1)h
//! ```
//!
//! Only whole-hour, non-transitioning offsets are mapped correctly. A trading
//! day that crosses a DST change keeps the offset observed at local midnight
//! for every period, and a fractional offset (e.g. +05:30) is truncated to its
//! hour component.
//!
//! Zero counts as non-negative: a UTC-aligned day maps period `i` to
//! midnight plus `i - 1` hours. Legacy reports left every period of a
//! zero-offset day stamped with the start instant; this mapper does not.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

/// UTC instant of period 1 plus the per-period step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketAnchor {
    pub start: NaiveDateTime,
    pub step: StepDirection,
}

impl BucketAnchor {
    /// UTC instant of the 1-based `period`
    pub fn instant(&self, period: u32) -> NaiveDateTime {
        let hours = Duration::hours(i64::from(period.saturating_sub(1)));
        match self.step {
            StepDirection::Forward => self.start + hours,
            StepDirection::Backward => self.start - hours,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BucketMapper {
    tz: Tz,
}

impl BucketMapper {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Whole-hour component of the zone's UTC offset at local midnight of `date`
    pub fn utc_offset_hours(&self, date: NaiveDate) -> i64 {
        let midnight = date.and_time(NaiveTime::MIN);
        let offset = self
            .tz
            .offset_from_local_datetime(&midnight)
            .earliest()
            .unwrap_or_else(|| self.tz.offset_from_utc_datetime(&midnight));

        i64::from(offset.fix().local_minus_utc()) / 3600
    }

    pub fn first_bucket(&self, date: NaiveDate) -> BucketAnchor {
        let offset = self.utc_offset_hours(date);
        let mut start = date.and_time(NaiveTime::MIN);

        if offset < 0 {
            start += Duration::days(1);
        }
        start -= Duration::hours(offset);

        // A zero offset (UTC, or London in winter) steps forward like any
        // non-negative offset; periods never collapse onto the start instant.
        let step = if offset < 0 {
            StepDirection::Backward
        } else {
            StepDirection::Forward
        };

        BucketAnchor { start, step }
    }

    pub fn bucket_instant(&self, date: NaiveDate, period: u32) -> NaiveDateTime {
        self.first_bucket(date).instant(period)
    }
}
