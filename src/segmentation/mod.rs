//! Segmentation masks and the per-segment index derived from them.
//!
//! - `LabelImage`: integer label raster, `0` is background
//! - `SegmentIndexBuilder`: groups pixels by label and derives centroids and outlines
//! - `SegmentIndex`: the resulting immutable geometry, queried by statistics and export

mod index;
mod label_image;
mod outline;

pub use index::{Centroid, Segment, SegmentId, SegmentIndex, SegmentIndexBuilder};
pub use label_image::LabelImage;
pub use outline::{PixelLocation, trace_outline};
