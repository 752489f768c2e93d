//! Dispatches statistics jobs to a bounded worker pool.

use std::collections::HashMap;

use super::{StatisticKey, StatisticsJobError, StatisticsRequest, StatisticsResult};
use crate::state::worker_pool::{PoolError, Ticket, WorkerPool};

type JobOutput = Result<StatisticsResult, StatisticsJobError>;

/// Completion of one dispatched statistics job.
#[derive(Debug)]
pub struct StatisticsCompletion {
    pub ticket: Ticket,
    pub result: JobOutput,
}

/// Runs statistics jobs off the coordinating thread.
///
/// Jobs are queued in arrival order when every worker is busy. Each
/// dispatched job yields exactly one `StatisticsCompletion`.
pub struct StatisticsJobDispatcher {
    pool: WorkerPool<StatisticsRequest>,
    /// Key of every job not yet collected, for tagging failures
    in_flight: HashMap<Ticket, StatisticKey>,
}

impl StatisticsJobDispatcher {
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        Ok(Self {
            pool: WorkerPool::spawn("statistics", threads)?,
            in_flight: HashMap::new(),
        })
    }

    /// Queue a job without blocking.
    pub fn dispatch(&mut self, request: StatisticsRequest) -> Result<Ticket, StatisticsJobError> {
        let key = request.key.clone();
        match self.pool.submit(request) {
            Ok(ticket) => {
                self.in_flight.insert(ticket, key);
                Ok(ticket)
            }
            Err(e) => {
                log::error!("Failed to dispatch {} of {}: {}", key.kind, key.channel, e);
                Err(StatisticsJobError::Shutdown {
                    channel: key.channel,
                    kind: key.kind,
                })
            }
        }
    }

    fn complete(&mut self, ticket: Ticket, outcome: Result<JobOutput, String>) -> StatisticsCompletion {
        let key = self.in_flight.remove(&ticket);
        let result = match outcome {
            Ok(result) => result,
            Err(message) => {
                let key = key.unwrap_or_else(|| StatisticKey::new("<unknown>", Default::default()));
                Err(StatisticsJobError::WorkerPanicked {
                    channel: key.channel,
                    kind: key.kind,
                    message,
                })
            }
        };

        match &result {
            Ok(r) => log::debug!(
                "Statistics job {} finished: {} of {} over {} segments",
                ticket,
                r.key.kind,
                r.key.channel,
                r.values.len()
            ),
            Err(e) => log::warn!("Statistics job {} failed: {}", ticket, e),
        }

        StatisticsCompletion { ticket, result }
    }

    /// Collect one finished job without blocking.
    pub fn try_take(&mut self) -> Option<StatisticsCompletion> {
        let finished = self.pool.try_recv()?;
        Some(self.complete(finished.ticket, finished.outcome))
    }

    /// Block until the job with `ticket` finishes.
    pub fn wait_for(&mut self, ticket: Ticket) -> StatisticsCompletion {
        match self.pool.wait_for(ticket) {
            Some(finished) => self.complete(finished.ticket, finished.outcome),
            None => {
                let key = self
                    .in_flight
                    .remove(&ticket)
                    .unwrap_or_else(|| StatisticKey::new("<unknown>", Default::default()));
                StatisticsCompletion {
                    ticket,
                    result: Err(StatisticsJobError::Shutdown {
                        channel: key.channel,
                        kind: key.kind,
                    }),
                }
            }
        }
    }

    /// Total number of jobs dispatched.
    pub fn dispatched_count(&self) -> usize {
        self.pool.dispatched_count()
    }

    /// Number of jobs dispatched but not yet collected.
    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn thread_count(&self) -> usize {
        self.pool.thread_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::SegmentIndexBuilder;
    use crate::statistics::StatisticKind;
    use std::sync::Arc;

    fn request(channel: &str, intensities: Vec<f32>) -> StatisticsRequest {
        let segments = SegmentIndexBuilder::from_labels(2, 2, vec![1, 1, 2, 2]).unwrap();
        StatisticsRequest {
            key: StatisticKey::new(channel, StatisticKind::Mean),
            intensities: intensities.into(),
            segments: Arc::new(segments),
        }
    }

    #[test]
    fn test_dispatch_and_wait() {
        let mut dispatcher = StatisticsJobDispatcher::new(2).unwrap();
        let ticket = dispatcher
            .dispatch(request("CD3", vec![1.0, 3.0, 10.0, 20.0]))
            .unwrap();
        let completion = dispatcher.wait_for(ticket);
        let result = completion.result.unwrap();
        assert_eq!(result.get(1), Some(2.0));
        assert_eq!(result.get(2), Some(15.0));
        assert_eq!(dispatcher.dispatched_count(), 1);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[test]
    fn test_failure_does_not_affect_other_jobs() {
        let mut dispatcher = StatisticsJobDispatcher::new(2).unwrap();
        let bad = dispatcher.dispatch(request("Bad", vec![1.0])).unwrap();
        let good = dispatcher.dispatch(request("Good", vec![0.0; 4])).unwrap();

        let error = dispatcher.wait_for(bad).result.unwrap_err();
        assert_eq!(error.channel(), "Bad");
        assert!(dispatcher.wait_for(good).result.is_ok());
    }

    #[test]
    fn test_try_take_collects_everything() {
        let mut dispatcher = StatisticsJobDispatcher::new(3).unwrap();
        for name in ["A", "B", "C", "D"] {
            dispatcher.dispatch(request(name, vec![1.0; 4])).unwrap();
        }

        let mut channels = Vec::new();
        for _ in 0..1000 {
            while let Some(completion) = dispatcher.try_take() {
                channels.push(completion.result.unwrap().key.channel);
            }
            if channels.len() == 4 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        channels.sort();
        assert_eq!(channels, vec!["A", "B", "C", "D"]);
    }
}
