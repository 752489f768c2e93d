//! Project state: dataset lifecycle, background decoding and continuations.

mod cache;
mod dataset;
mod decoder;
mod error;
mod project;
mod reactions;
#[cfg(test)]
mod test_sources;
pub mod worker_pool;

pub use cache::DatasetCache;
pub use dataset::{Dataset, DatasetId, DecodedDataset, LoadState, dataset_name};
pub use decoder::{DatasetDecoder, DecodeCompletion, DecodeJob};
pub use error::{CacheError, ProjectError};
pub use project::Project;
pub use reactions::Reactions;
