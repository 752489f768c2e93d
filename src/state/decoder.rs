//! Background decoding of whole datasets.
//!
//! One job per dataset: decode every channel, then the segmentation mask
//! (checked against the channel dimensions), then build the segment index.
//! Several datasets decode concurrently, bounded by the pool size.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::dataset::{DatasetId, DecodedDataset};
use super::worker_pool::{Job, PoolError, Ticket, WorkerPool};
use crate::data::{ChannelSource, MaskSource};
use crate::segmentation::SegmentIndexBuilder;

/// Decode request for one dataset.
pub struct DecodeJob {
    pub dataset: DatasetId,
    /// Segmentation mask to decode, if any
    pub mask_path: Option<PathBuf>,
    pub channel_source: Arc<dyn ChannelSource>,
    pub mask_source: Arc<dyn MaskSource>,
}

impl Job for DecodeJob {
    type Output = DecodedDataset;

    fn describe(&self) -> String {
        format!("decode {:?}", self.dataset)
    }

    fn run(self) -> DecodedDataset {
        let mut decoded = DecodedDataset::default();

        match self
            .channel_source
            .load_channels(&self.dataset, self.mask_path.as_deref())
        {
            Ok(load) => {
                decoded.channels = load.channels;
                decoded
                    .errors
                    .extend(load.errors.iter().map(|e| e.to_string()));
            }
            Err(e) => {
                log::warn!("Failed to read channels of {:?}: {}", self.dataset, e);
                decoded.errors.push(e.to_string());
            }
        }

        if let Some(mask_path) = &self.mask_path {
            let expected = (!decoded.channels.is_empty())
                .then_some((decoded.channels.width, decoded.channels.height));

            match self.mask_source.load_mask(mask_path, expected) {
                Ok(labels) => {
                    if decoded.channels.is_empty() {
                        decoded.channels.width = labels.width();
                        decoded.channels.height = labels.height();
                    }
                    decoded.segmentation = Some(SegmentIndexBuilder::from_label_image(&labels));
                }
                Err(e) => {
                    log::warn!("Failed to load segmentation {:?}: {}", mask_path, e);
                    decoded.errors.push(e.to_string());
                }
            }
        }

        decoded
    }
}

/// Completion of one dataset decode.
#[derive(Debug)]
pub struct DecodeCompletion {
    pub dataset: DatasetId,
    /// Dataset generation the job was started for
    pub generation: u64,
    pub decoded: DecodedDataset,
}

/// Runs `DecodeJob`s on a worker pool and tags results with their dataset.
pub struct DatasetDecoder {
    pool: WorkerPool<DecodeJob>,
    in_flight: HashMap<Ticket, (DatasetId, u64)>,
}

impl DatasetDecoder {
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        Ok(Self {
            pool: WorkerPool::spawn("dataset-decoder", threads)?,
            in_flight: HashMap::new(),
        })
    }

    /// Queue a decode for `generation` of a dataset.
    pub fn request(&mut self, job: DecodeJob, generation: u64) -> Result<Ticket, PoolError> {
        let dataset = job.dataset.clone();
        let ticket = self.pool.submit(job)?;
        self.in_flight.insert(ticket, (dataset, generation));
        Ok(ticket)
    }

    fn complete(&mut self, ticket: Ticket, outcome: Result<DecodedDataset, String>) -> Option<DecodeCompletion> {
        let (dataset, generation) = self.in_flight.remove(&ticket)?;
        let decoded = outcome.unwrap_or_else(|message| DecodedDataset {
            errors: vec![format!("Decoding failed: {}", message)],
            ..Default::default()
        });
        Some(DecodeCompletion {
            dataset,
            generation,
            decoded,
        })
    }

    /// Collect one finished decode without blocking.
    pub fn try_take(&mut self) -> Option<DecodeCompletion> {
        let finished = self.pool.try_recv()?;
        self.complete(finished.ticket, finished.outcome)
    }

    /// Block until the decode with `ticket` finishes.
    pub fn wait_for(&mut self, ticket: Ticket) -> Option<DecodeCompletion> {
        let finished = self.pool.wait_for(ticket)?;
        self.complete(finished.ticket, finished.outcome)
    }

    pub fn is_pending(&self, ticket: Ticket) -> bool {
        self.pool.is_pending(ticket)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }
}
