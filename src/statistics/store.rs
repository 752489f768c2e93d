//! Per-dataset memo of computed statistics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{
    StatisticKey, StatisticKind, StatisticsCompletion, StatisticsError, StatisticsJobDispatcher,
    StatisticsJobError, StatisticsRequest, StatisticsResult,
};
use crate::data::ImageChannels;
use crate::segmentation::{SegmentId, SegmentIndex};
use crate::state::CacheError;
use crate::state::worker_pool::Ticket;

/// Memoizing cache of statistics for one dataset.
///
/// A whole channel is computed by one job; afterwards every segment value of
/// that (channel, kind) pair is answered from memory. Entries are only ever
/// dropped all at once (`clear`/`detach`). Failed jobs leave no entry, so a
/// later query dispatches again.
///
/// The store is mutated only by its owner on the coordinating thread; workers
/// return results through the dispatcher and the owner commits them.
#[derive(Debug, Default)]
pub struct SegmentationStatisticsStore {
    channels: Option<Arc<ImageChannels>>,
    segments: Option<Arc<SegmentIndex>>,
    computed: BTreeMap<StatisticKey, StatisticsResult>,
    pending: HashMap<StatisticKey, Ticket>,
    errors: Vec<StatisticsJobError>,
}

impl SegmentationStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the buffers statistics are computed from. Drops all cached values.
    pub fn attach(&mut self, channels: Arc<ImageChannels>, segments: Arc<SegmentIndex>) {
        self.clear();
        self.channels = Some(channels);
        self.segments = Some(segments);
    }

    /// Release the buffers and all cached values.
    pub fn detach(&mut self) {
        self.clear();
        self.channels = None;
        self.segments = None;
    }

    /// Drop every cached value. Results of jobs still in flight are discarded
    /// when they arrive.
    pub fn clear(&mut self) {
        if !self.computed.is_empty() || !self.pending.is_empty() {
            log::debug!(
                "Clearing statistics store ({} computed, {} pending)",
                self.computed.len(),
                self.pending.len()
            );
        }
        self.computed.clear();
        self.pending.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.channels.is_some() && self.segments.is_some()
    }

    fn build_request(&self, key: &StatisticKey) -> Result<StatisticsRequest, CacheError> {
        let channels = self.channels.as_ref().ok_or(CacheError::NotLoaded)?;
        let segments = self.segments.as_ref().ok_or(CacheError::NoSegmentation)?;
        let channel = channels
            .get(&key.channel)
            .ok_or_else(|| CacheError::UnknownChannel(key.channel.clone()))?;

        Ok(StatisticsRequest {
            key: key.clone(),
            intensities: Arc::clone(&channel.data),
            segments: Arc::clone(segments),
        })
    }

    /// Ensure a job for `(channel, kind)` is computed or in flight, without blocking.
    ///
    /// Returns the ticket of the in-flight job, or `None` if the values are
    /// already cached.
    pub fn request(
        &mut self,
        channel: &str,
        kind: StatisticKind,
        dispatcher: &mut StatisticsJobDispatcher,
    ) -> Result<Option<Ticket>, StatisticsError> {
        let key = StatisticKey::new(channel, kind);
        if self.computed.contains_key(&key) {
            return Ok(None);
        }
        if let Some(&ticket) = self.pending.get(&key) {
            return Ok(Some(ticket));
        }

        let request = self.build_request(&key)?;
        let ticket = dispatcher.dispatch(request)?;
        self.pending.insert(key, ticket);
        Ok(Some(ticket))
    }

    /// Whether this store is waiting for the job with `ticket`.
    pub fn is_waiting_for(&self, ticket: Ticket) -> bool {
        self.pending.values().any(|&t| t == ticket)
    }

    /// Commit a finished job. Returns `false` if the store no longer waits for
    /// it (cleared or evicted meanwhile), in which case the result is dropped.
    pub fn commit(&mut self, completion: StatisticsCompletion) -> bool {
        let Some(key) = self
            .pending
            .iter()
            .find(|(_, t)| **t == completion.ticket)
            .map(|(key, _)| key.clone())
        else {
            log::debug!("Discarding stale statistics result {}", completion.ticket);
            return false;
        };
        self.pending.remove(&key);

        match completion.result {
            Ok(result) => {
                self.computed.insert(key, result);
            }
            Err(e) => {
                log::warn!("Statistics for {} ({}) failed: {}", key.channel, key.kind, e);
                self.errors.push(e);
            }
        }
        true
    }

    /// Compute `(channel, kind)` if needed, blocking until the job finishes.
    pub fn compute(
        &mut self,
        channel: &str,
        kind: StatisticKind,
        dispatcher: &mut StatisticsJobDispatcher,
    ) -> Result<&StatisticsResult, StatisticsError> {
        let key = StatisticKey::new(channel, kind);
        if let Some(ticket) = self.request(channel, kind, dispatcher)? {
            let completion = dispatcher.wait_for(ticket);
            if let Err(e) = &completion.result {
                self.pending.remove(&key);
                self.errors.push(e.clone());
                return Err(e.clone().into());
            }
            self.commit(completion);
        }

        self.computed.get(&key).ok_or(StatisticsError::NotReady(CacheError::NotLoaded))
    }

    /// Value of `(channel, kind)` for one segment.
    ///
    /// Dispatches and waits only the first time a (channel, kind) pair is
    /// queried. `Ok(None)` means the segment id is unknown; NaN means the
    /// segment has no pixels.
    pub fn value_for(
        &mut self,
        channel: &str,
        kind: StatisticKind,
        segment: SegmentId,
        dispatcher: &mut StatisticsJobDispatcher,
    ) -> Result<Option<f64>, StatisticsError> {
        Ok(self.compute(channel, kind, dispatcher)?.get(segment))
    }

    /// Values of `(channel, kind)` for several segments, in the given order.
    pub fn values_for(
        &mut self,
        channel: &str,
        kind: StatisticKind,
        segments: &[SegmentId],
        dispatcher: &mut StatisticsJobDispatcher,
    ) -> Result<Vec<Option<f64>>, StatisticsError> {
        let result = self.compute(channel, kind, dispatcher)?;
        Ok(segments.iter().map(|&id| result.get(id)).collect())
    }

    /// Values of one segment across several channels.
    pub fn segment_values(
        &mut self,
        segment: SegmentId,
        channels: &[String],
        kind: StatisticKind,
        dispatcher: &mut StatisticsJobDispatcher,
    ) -> Result<Vec<Option<f64>>, StatisticsError> {
        // Queue every missing channel first so the jobs run in parallel
        for channel in channels {
            self.request(channel, kind, dispatcher)?;
        }
        channels
            .iter()
            .map(|channel| self.value_for(channel, kind, segment, dispatcher))
            .collect()
    }

    /// Segment ids whose statistic lies in `[min, max]` inclusive, ascending.
    ///
    /// Segments without pixels (NaN) never match.
    pub fn segments_in_range(
        &mut self,
        channel: &str,
        min: f64,
        max: f64,
        use_mean: bool,
        dispatcher: &mut StatisticsJobDispatcher,
    ) -> Result<Vec<SegmentId>, StatisticsError> {
        let kind = StatisticKind::from_use_mean(use_mean);
        Ok(self
            .compute(channel, kind, dispatcher)?
            .segments_in_range(min, max))
    }

    /// Cached result for `(channel, kind)`, if computed.
    pub fn result(&self, channel: &str, kind: StatisticKind) -> Option<&StatisticsResult> {
        self.computed.get(&StatisticKey::new(channel, kind))
    }

    pub fn is_computed(&self, channel: &str, kind: StatisticKind) -> bool {
        self.result(channel, kind).is_some()
    }

    /// Number of cached (channel, kind) maps.
    pub fn computed_count(&self) -> usize {
        self.computed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain accumulated job errors.
    pub fn take_errors(&mut self) -> Vec<StatisticsJobError> {
        std::mem::take(&mut self.errors)
    }
}
