//! Statistics error types.

use thiserror::Error;

use super::StatisticKind;
use crate::state::CacheError;

/// A statistics job that could not produce a result.
///
/// Always tagged with the channel and statistic it was computing. The
/// corresponding store entry stays absent so the request can be retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatisticsJobError {
    /// Intensity buffer length differs from the segmentation's pixel count
    #[error("Channel {channel} ({kind}): intensity buffer holds {found} values, expected {expected}")]
    BufferLength {
        channel: String,
        kind: StatisticKind,
        expected: usize,
        found: usize,
    },

    /// The worker running the job panicked
    #[error("Channel {channel} ({kind}): worker failed: {message}")]
    WorkerPanicked {
        channel: String,
        kind: StatisticKind,
        message: String,
    },

    /// The dispatcher's workers are gone
    #[error("Channel {channel} ({kind}): statistics dispatcher has shut down")]
    Shutdown { channel: String, kind: StatisticKind },
}

impl StatisticsJobError {
    /// Channel the failed job was computing.
    pub fn channel(&self) -> &str {
        match self {
            StatisticsJobError::BufferLength { channel, .. }
            | StatisticsJobError::WorkerPanicked { channel, .. }
            | StatisticsJobError::Shutdown { channel, .. } => channel,
        }
    }

    pub fn kind(&self) -> StatisticKind {
        match self {
            StatisticsJobError::BufferLength { kind, .. }
            | StatisticsJobError::WorkerPanicked { kind, .. }
            | StatisticsJobError::Shutdown { kind, .. } => *kind,
        }
    }
}

/// Error returned by statistics queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatisticsError {
    /// The dataset is not in a state that can answer the query
    #[error(transparent)]
    NotReady(#[from] CacheError),

    /// The statistics job failed
    #[error(transparent)]
    Job(#[from] StatisticsJobError),
}
