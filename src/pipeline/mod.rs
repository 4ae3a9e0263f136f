//! Scheduling runtime for the position report
//!
//! - `scheduler` - interval loop, per-tick state machine and unit of work
//! - `retry` - attempt budget for a tick
//! - `clock` - wall clock and sleep abstractions

pub mod clock;
pub mod retry;
pub mod scheduler;

pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use retry::{RetryDecision, RunAttempt};
pub use scheduler::{
    report_path, ReportScheduler, SchedulerDeps, SchedulerSettings, TickError, TickOutcome, TickState,
};
