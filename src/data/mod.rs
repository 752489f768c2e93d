//! Channel data and the loaders that decode it from disk.
//!
//! This module provides:
//! - `Channel` / `ImageChannels`: decoded per-pixel intensity planes of one dataset
//! - `LoaderRegistry`: extensible system for decoding single raster planes
//! - `ChannelSource` / `MaskSource`: the collaborators the dataset cache uses
//!   to turn a directory into channels and a file into a label image
//!
//! ## Adding New Formats
//!
//! To add support for a new raster format:
//!
//! 1. Create a new loader in `loaders/` implementing `RasterLoader`
//! 2. Register it in `LoaderRegistry::new()`
//!
//! ```rust,ignore
//! use cytoset::data::{Raster, RasterLoader, LoaderError};
//!
//! pub struct MyFormatLoader;
//!
//! impl RasterLoader for MyFormatLoader {
//!     fn id(&self) -> &'static str { "myformat" }
//!     fn display_name(&self) -> &'static str { "My Format" }
//!     fn extensions(&self) -> &'static [&'static str] { &["myf"] }
//!     fn can_load(&self, data: &[u8]) -> bool { /* check magic bytes */ }
//!     fn load(&self, data: &[u8]) -> Result<Raster, LoaderError> { /* ... */ }
//! }
//! ```

mod channels;
mod error;
mod loader;
pub mod loaders;
mod source;

pub use channels::{Channel, ChannelError, ImageChannels, MinMax};
pub use error::DecodeError;
pub use loader::{LoaderError, LoaderRegistry, Raster, RasterData, RasterLoader};
pub use source::{ChannelLoad, ChannelSource, FileMaskSource, FolderChannelSource, MaskSource};
