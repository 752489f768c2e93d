//! Trait-based raster loading system.
//!
//! Every channel image and every segmentation mask is a single 2-D raster
//! plane. New file formats can be added by implementing the `RasterLoader`
//! trait.
//!
//! ## Supported Formats
//!
//! - **Standard Images**: TIFF, PNG (grayscale, 8/16-bit kept as raw integers)
//! - **NumPy Arrays**: 2-D `.npy` files in `(height, width)` row-major order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cytoset::data::LoaderRegistry;
//!
//! let registry = LoaderRegistry::new();
//! let raster = registry.load(&bytes, Some("CD45.tif"))?;
//! ```

/// Error type for loader operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoaderError {
    /// A specific loader rejected the data.
    #[error("[{loader}] {message}")]
    Decode {
        /// Loader that produced the error
        loader: &'static str,
        /// Human-readable error message
        message: String,
    },

    /// No registered loader could decode the data.
    #[error("No loader could handle the data{0}")]
    NoLoader(String),
}

impl LoaderError {
    /// Create an error attributed to a loader.
    pub fn decode(loader: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            loader,
            message: message.into(),
        }
    }
}

/// Pixel values of a decoded raster.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterData {
    /// Unsigned integer samples (8/16/32-bit sources)
    Integer(Vec<u32>),
    /// Floating point samples
    Float(Vec<f32>),
}

impl RasterData {
    pub fn len(&self) -> usize {
        match self {
            RasterData::Integer(v) => v.len(),
            RasterData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single decoded 2-D plane in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height` samples
    pub data: RasterData,
}

impl Raster {
    /// Convert samples to intensities.
    pub fn into_intensities(self) -> Vec<f32> {
        match self.data {
            RasterData::Integer(v) => v.into_iter().map(|x| x as f32).collect(),
            RasterData::Float(v) => v,
        }
    }

    /// Convert samples to integer labels.
    ///
    /// Float rasters are accepted when every sample is a non-negative whole
    /// number that fits in `u32`.
    pub fn into_labels(self) -> Result<Vec<u32>, String> {
        match self.data {
            RasterData::Integer(v) => Ok(v),
            RasterData::Float(v) => v
                .into_iter()
                .enumerate()
                .map(|(i, x)| {
                    if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x <= u32::MAX as f32 {
                        Ok(x as u32)
                    } else {
                        Err(format!("pixel {} has non-integer label value {}", i, x))
                    }
                })
                .collect(),
        }
    }
}

/// Trait for raster format loaders.
///
/// Each format implements this trait to provide decoding from raw bytes to a
/// single `Raster` plane.
pub trait RasterLoader: Send + Sync {
    /// Unique identifier for this loader (e.g., "image", "npy").
    fn id(&self) -> &'static str;

    /// Human-readable name for log output.
    fn display_name(&self) -> &'static str;

    /// File extensions this loader handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check if this loader can handle the given data (magic bytes).
    fn can_load(&self, data: &[u8]) -> bool;

    /// Decode a raster from raw file bytes.
    fn load(&self, data: &[u8]) -> Result<Raster, LoaderError>;

    /// Priority for format detection (higher = checked first).
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry of available raster loaders.
///
/// Provides format detection and unified loading interface.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn RasterLoader>>,
}

impl LoaderRegistry {
    /// Create a new registry with all built-in loaders.
    pub fn new() -> Self {
        let mut registry = Self {
            loaders: Vec::new(),
        };

        registry.register(Box::new(super::loaders::ImageLoader));
        registry.register(Box::new(super::loaders::NpyLoader));

        registry
    }

    /// Register a new loader.
    pub fn register(&mut self, loader: Box<dyn RasterLoader>) {
        self.loaders.push(loader);
        self.loaders.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Get all supported file extensions (for file filtering).
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .loaders
            .iter()
            .flat_map(|l| l.extensions().iter().copied())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    fn loaders_for_extension(&self, ext: &str) -> impl Iterator<Item = &dyn RasterLoader> {
        let ext_lower = ext.to_lowercase();
        self.loaders
            .iter()
            .filter(move |l| l.extensions().iter().any(|e| *e == ext_lower))
            .map(|l| l.as_ref())
    }

    /// Load data, auto-detecting the format.
    ///
    /// Tries loaders matching the file extension first, then magic byte
    /// detection. The last loader error is reported if everything fails.
    pub fn load(&self, data: &[u8], filename: Option<&str>) -> Result<Raster, LoaderError> {
        let extension = filename.and_then(|f| f.rsplit_once('.').map(|(_, e)| e.to_lowercase()));
        let mut last_error = None;

        if let Some(ref ext) = extension {
            for loader in self.loaders_for_extension(ext) {
                match loader.load(data) {
                    Ok(raster) => {
                        log::trace!("Loaded with {} loader (by extension)", loader.id());
                        return Ok(raster);
                    }
                    Err(e) => {
                        log::trace!("Loader {} failed: {}", loader.id(), e);
                        last_error = Some(e);
                    }
                }
            }
        }

        for loader in self.loaders.iter().filter(|l| l.can_load(data)) {
            match loader.load(data) {
                Ok(raster) => {
                    log::trace!("Loaded with {} loader (by detection)", loader.id());
                    return Ok(raster);
                }
                Err(e) => {
                    log::trace!("Detected loader {} failed: {}", loader.id(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LoaderError::NoLoader(
                filename
                    .map(|f| format!(" (file: {})", f))
                    .unwrap_or_default(),
            )
        }))
    }

    /// Check if a filename has a supported extension.
    pub fn is_supported_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.supported_extensions()
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }

    /// Get all registered loaders.
    pub fn loaders(&self) -> &[Box<dyn RasterLoader>] {
        &self.loaders
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
