//! Population and intensity file import/export.
//!
//! Population files are handled through the `PopulationFormat` trait so new
//! formats can be added without touching the callers.
//!
//! ## Supported Formats
//!
//! - **JSON**: full fidelity (names, colors, notes, source regions) for one dataset
//! - **CSV**: `segmentId,populationName` rows for one dataset
//! - **Project CSV**: `datasetName,segmentId,populationName` rows for a whole project
//!
//! Marker intensities are exported through `IntensityTable`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cytoset::format::{ExportOptions, FormatRegistry, PopulationData};
//!
//! let registry = FormatRegistry::new();
//! let format = registry.get("csv").unwrap();
//! format.export(&PopulationData::single(populations), path, &ExportOptions::default())?;
//! ```

mod error;
pub mod formats;
mod intensities;
mod project;
mod registry;
mod traits;

pub use error::FormatError;
pub use intensities::{IntensityRow, IntensityTable};
pub use project::{DatasetPopulations, PopulationData};
pub use registry::FormatRegistry;
pub use traits::{ExportOptions, ExportResult, FormatWarning, PopulationFormat};
