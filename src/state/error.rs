//! Dataset cache and project errors.

use std::path::PathBuf;

use thiserror::Error;

/// A query hit a dataset that is not ready to answer it.
///
/// These are "not ready" conditions, not failures: re-activating the dataset
/// (or loading a segmentation) resolves them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The dataset's buffers are not resident (unloaded, evicted or still loading)
    #[error("Dataset is not loaded")]
    NotLoaded,

    /// The dataset identifier is not part of the project
    #[error("Unknown dataset {0:?}")]
    UnknownDataset(PathBuf),

    /// The dataset has no segmentation loaded
    #[error("Dataset has no segmentation")]
    NoSegmentation,

    /// The requested channel does not exist in the dataset
    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),
}

/// Errors raised by project-level operations.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Reading the project directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker pool could not be started or has stopped
    #[error(transparent)]
    Pool(#[from] super::worker_pool::PoolError),

    #[error(transparent)]
    NotReady(#[from] CacheError),

    #[error(transparent)]
    Statistics(#[from] crate::statistics::StatisticsError),

    /// Population or intensity file import/export failed
    #[error(transparent)]
    Format(#[from] crate::format::FormatError),

    /// No registered population format has this id
    #[error("Unknown population format '{0}'")]
    UnknownFormat(String),
}
