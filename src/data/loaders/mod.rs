//! Built-in raster loaders.
//!
//! This module contains implementations of the `RasterLoader` trait
//! for the file formats found in dataset directories.

mod image_loader;
mod npy_loader;

pub use image_loader::ImageLoader;
pub use npy_loader::NpyLoader;
