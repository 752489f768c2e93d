//! Request and result records for one statistics job.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{StatisticKind, StatisticsJobError};
use crate::data::MinMax;
use crate::segmentation::{SegmentId, SegmentIndex};
use crate::state::worker_pool::Job;

/// Identifies one memoized statistic map: a channel and a statistic kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatisticKey {
    pub channel: String,
    pub kind: StatisticKind,
}

impl StatisticKey {
    pub fn new(channel: impl Into<String>, kind: StatisticKind) -> Self {
        Self {
            channel: channel.into(),
            kind,
        }
    }
}

/// Compute one statistic of one channel over every segment.
///
/// Inputs are shared read-only with the worker.
#[derive(Debug, Clone)]
pub struct StatisticsRequest {
    pub key: StatisticKey,
    /// Row-major channel intensities
    pub intensities: Arc<[f32]>,
    /// Segment pixel membership
    pub segments: Arc<SegmentIndex>,
}

/// Per-segment values of one statistic of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsResult {
    pub key: StatisticKey,
    /// Value per segment id; NaN for segments without non-NaN samples
    pub values: BTreeMap<SegmentId, f64>,
    /// Range over the non-NaN values
    pub min_max: Option<MinMax>,
}

impl StatisticsResult {
    pub fn get(&self, segment: SegmentId) -> Option<f64> {
        self.values.get(&segment).copied()
    }

    /// Segment ids whose value lies in `[min, max]`, ascending.
    pub fn segments_in_range(&self, min: f64, max: f64) -> Vec<SegmentId> {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_nan() && **value >= min && **value <= max)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl StatisticsRequest {
    /// Run the aggregation on the calling thread.
    pub fn compute(&self) -> Result<StatisticsResult, StatisticsJobError> {
        let expected = self.segments.width() as usize * self.segments.height() as usize;
        if self.intensities.len() != expected {
            return Err(StatisticsJobError::BufferLength {
                channel: self.key.channel.clone(),
                kind: self.key.kind,
                expected,
                found: self.intensities.len(),
            });
        }

        let mut scratch: Vec<f64> = Vec::new();
        let values: BTreeMap<SegmentId, f64> = self
            .segments
            .iter()
            .map(|segment| {
                scratch.clear();
                scratch.extend(
                    segment
                        .pixels
                        .iter()
                        .filter_map(|&p| self.intensities.get(p))
                        .filter(|v| !v.is_nan())
                        .map(|&v| f64::from(v)),
                );
                (segment.id, self.key.kind.compute(&mut scratch))
            })
            .collect();

        let min_max = MinMax::from_values(values.values().copied());
        Ok(StatisticsResult {
            key: self.key.clone(),
            values,
            min_max,
        })
    }
}

impl Job for StatisticsRequest {
    type Output = Result<StatisticsResult, StatisticsJobError>;

    fn describe(&self) -> String {
        format!("{} of {}", self.key.kind, self.key.channel)
    }

    fn run(self) -> Self::Output {
        self.compute()
    }
}
