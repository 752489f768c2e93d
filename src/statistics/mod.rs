//! Per-segment aggregate statistics.
//!
//! A `StatisticsRequest` asks for one statistic of one channel over every
//! segment. Requests run on the `StatisticsJobDispatcher` worker pool and the
//! owning dataset's `SegmentationStatisticsStore` memoizes the results.

mod dispatcher;
mod error;
mod job;
mod kind;
mod store;

pub use dispatcher::{StatisticsCompletion, StatisticsJobDispatcher};
pub use error::{StatisticsError, StatisticsJobError};
pub use job::{StatisticKey, StatisticsRequest, StatisticsResult};
pub use kind::{StatisticKind, mean, median};
pub use store::SegmentationStatisticsStore;
