//! Report Core - day-ahead position aggregation
//!
//! ```text
//! Vec<PowerTrade> (one trading day)
//!     ↓
//! TradeAggregator (sum volume per period)
//!     ↓  BucketMapper (period → UTC instant in trader timezone)
//! Vec<AggregateRecord>
//!     ↓
//! ReportWriter → CSV backend (datetime;Volume)
//! ```

pub mod aggregator;
pub mod bucket;
pub mod csv_writer;
pub mod trade;
pub mod writer_backend;

pub use aggregator::{AggregationError, TradeAggregator};
pub use bucket::{BucketAnchor, BucketMapper, StepDirection};
pub use csv_writer::CsvReportWriter;
pub use trade::{AggregateRecord, PowerPeriod, PowerTrade};
pub use writer_backend::{ReportWriter, ReportWriterError};
