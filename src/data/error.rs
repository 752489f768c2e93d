//! Error type for channel and segmentation mask decoding.

use std::path::PathBuf;

use thiserror::Error;

use crate::data::LoaderError;

/// Errors raised while decoding a label image or a channel buffer.
///
/// A `DecodeError` is always scoped to one dataset (or one channel of it);
/// it never aborts decoding of other channels or datasets.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// I/O error while reading the source file or directory
    #[error("IO error reading {path:?}: {source}")]
    Io {
        /// File or directory that could not be read
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The raster could not be decoded by any loader
    #[error("Failed to decode {path:?}: {source}")]
    Loader {
        /// File that could not be decoded
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    /// Mask dimensions differ from the dataset's channel dimensions
    #[error("Dimension mismatch in {path:?}: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        /// Mask file
        path: PathBuf,
        /// Expected (width, height)
        expected: (u32, u32),
        /// Decoded (width, height)
        found: (u32, u32),
    },

    /// Mask contains values that are not valid labels
    #[error("Invalid label image {path:?}: {message}")]
    InvalidLabels {
        /// Mask file
        path: PathBuf,
        /// Description of the offending values
        message: String,
    },

    /// A raw buffer does not hold `width * height` values
    #[error("Buffer holds {found} values, expected {expected} ({width}x{height})")]
    BufferLength {
        width: u32,
        height: u32,
        expected: usize,
        found: usize,
    },

    /// A pre-parsed segment references a pixel outside the image
    #[error("Segment {segment} references pixel {pixel} outside a {width}x{height} image")]
    PixelOutOfBounds {
        segment: u32,
        pixel: usize,
        width: u32,
        height: u32,
    },

    /// A pre-parsed segment uses the background label as its id
    #[error("Segment id {0} is reserved for background")]
    BackgroundSegment(u32),
}
