//! Loader for NumPy `.npy` files.
//!
//! Segmentation pipelines frequently write label masks as NumPy arrays, and
//! some acquisition tools export channels the same way.

use std::io::Cursor;

use ndarray::{ArrayD, Ix2};
use ndarray_npy::{ReadNpyExt, ReadableElement};

use crate::data::loader::{LoaderError, Raster, RasterData, RasterLoader};

/// Loader for NumPy `.npy` files.
///
/// **Expected array shape**: 2-D `(height, width)` in row-major order, the
/// layout produced by `numpy.save` on an image array.
///
/// Supported data types: `u8`, `u16`, `u32`, `i32`, `i64`, `f32`, `f64`.
/// Unsigned integers (and signed integers without negative values) decode as
/// integer samples; everything else decodes as float.
pub struct NpyLoader;

impl NpyLoader {
    /// NumPy magic bytes: \x93NUMPY
    const MAGIC: &'static [u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

    fn read<T: ReadableElement>(data: &[u8]) -> Option<ArrayD<T>> {
        ArrayD::<T>::read_npy(Cursor::new(data)).ok()
    }

    /// Check the array is 2-D and return `(width, height)` plus samples in
    /// row-major order.
    fn into_plane<T: Clone>(array: ArrayD<T>) -> Result<(u32, u32, Vec<T>), LoaderError> {
        let shape = array.shape().to_vec();
        log::debug!("NpyLoader: array shape = {:?}", shape);

        let plane = array.into_dimensionality::<Ix2>().map_err(|_| {
            LoaderError::decode(
                "npy",
                format!(
                    "Unsupported array dimensions: {} (expected 2)",
                    shape.len()
                ),
            )
        })?;

        let (height, width) = plane.dim();
        let values: Vec<T> = plane.iter().cloned().collect();
        Ok((width as u32, height as u32, values))
    }

    fn integer_raster<T>(array: ArrayD<T>) -> Result<Raster, LoaderError>
    where
        T: Clone + Copy + TryInto<u32> + Into<f64>,
    {
        let (width, height, values) = Self::into_plane(array)?;
        let converted: Option<Vec<u32>> = values.iter().map(|&v| v.try_into().ok()).collect();
        let data = match converted {
            Some(ints) => RasterData::Integer(ints),
            None => RasterData::Float(
                values
                    .into_iter()
                    .map(|v| Into::<f64>::into(v) as f32)
                    .collect(),
            ),
        };
        Ok(Raster {
            width,
            height,
            data,
        })
    }

    fn float_raster<T>(array: ArrayD<T>, convert: impl Fn(T) -> f32) -> Result<Raster, LoaderError>
    where
        T: Clone,
    {
        let (width, height, values) = Self::into_plane(array)?;
        Ok(Raster {
            width,
            height,
            data: RasterData::Float(values.into_iter().map(convert).collect()),
        })
    }
}

impl RasterLoader for NpyLoader {
    fn id(&self) -> &'static str {
        "npy"
    }

    fn display_name(&self) -> &'static str {
        "NumPy Array (.npy)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["npy"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        data.len() >= Self::MAGIC.len() && data.starts_with(Self::MAGIC)
    }

    fn load(&self, data: &[u8]) -> Result<Raster, LoaderError> {
        // dtype must match exactly, so try each supported type in turn
        if let Some(array) = Self::read::<u8>(data) {
            return Self::integer_raster(array);
        }
        if let Some(array) = Self::read::<u16>(data) {
            return Self::integer_raster(array);
        }
        if let Some(array) = Self::read::<u32>(data) {
            return Self::integer_raster(array);
        }
        if let Some(array) = Self::read::<i32>(data) {
            return Self::integer_raster(array);
        }
        if let Some(array) = Self::read::<i64>(data) {
            let (width, height, values) = Self::into_plane(array)?;
            let data = match values
                .iter()
                .map(|&v| u32::try_from(v).ok())
                .collect::<Option<Vec<u32>>>()
            {
                Some(ints) => RasterData::Integer(ints),
                None => RasterData::Float(values.into_iter().map(|v| v as f32).collect()),
            };
            return Ok(Raster {
                width,
                height,
                data,
            });
        }
        if let Some(array) = Self::read::<f32>(data) {
            return Self::float_raster(array, |v| v);
        }
        if let Some(array) = Self::read::<f64>(data) {
            return Self::float_raster(array, |v| v as f32);
        }

        Err(LoaderError::decode(
            self.id(),
            "Failed to read NumPy array: unsupported dtype or invalid format",
        ))
    }

    fn priority(&self) -> i32 {
        // NumPy files are checked before generic images
        10
    }
}
