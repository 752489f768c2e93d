//! Loader for standard image formats (TIFF, PNG).
//!
//! Microscopy channels and label masks are single-plane grayscale images.
//! 8-bit and 16-bit samples are kept as raw integers so label values and
//! raw intensities survive decoding unchanged; anything else is converted to
//! 32-bit float luma.

use image::DynamicImage;

use crate::data::loader::{LoaderError, Raster, RasterData, RasterLoader};

/// Loader for standard image formats.
pub struct ImageLoader;

impl ImageLoader {
    fn image_to_raster(img: DynamicImage) -> Raster {
        let width = img.width();
        let height = img.height();

        let data = match img {
            DynamicImage::ImageLuma8(buf) => {
                RasterData::Integer(buf.into_raw().into_iter().map(u32::from).collect())
            }
            DynamicImage::ImageLuma16(buf) => {
                RasterData::Integer(buf.into_raw().into_iter().map(u32::from).collect())
            }
            other => {
                log::debug!(
                    "ImageLoader: converting {:?} image to float luma",
                    other.color()
                );
                RasterData::Float(other.to_luma32f().into_raw())
            }
        };

        Raster {
            width,
            height,
            data,
        }
    }
}

impl RasterLoader for ImageLoader {
    fn id(&self) -> &'static str {
        "image"
    }

    fn display_name(&self) -> &'static str {
        "Standard Image (grayscale)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tiff", "tif", "png"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        if data.len() < 8 {
            return false;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return true;
        }

        // TIFF: 49 49 2A 00 (little endian) or 4D 4D 00 2A (big endian)
        data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    }

    fn load(&self, data: &[u8]) -> Result<Raster, LoaderError> {
        let img = image::load_from_memory(data)
            .map_err(|e| LoaderError::decode(self.id(), format!("Failed to decode image: {}", e)))?;

        let raster = Self::image_to_raster(img);
        log::trace!(
            "ImageLoader: loaded {}x{} plane",
            raster.width,
            raster.height
        );
        Ok(raster)
    }
}
