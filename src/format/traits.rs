//! Trait definitions for population file formats.

use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::format::project::PopulationData;

/// Trait for population import/export implementations.
///
/// Each format (JSON, per-dataset CSV, project CSV) converts between
/// `PopulationData` and its text representation. File I/O is provided on top
/// of the string conversions.
pub trait PopulationFormat: Send + Sync {
    /// Unique identifier for this format (e.g., "json", "csv").
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// File extensions this format uses.
    fn extensions(&self) -> &[&'static str];

    /// Whether one file holds the populations of several datasets.
    fn supports_multiple_datasets(&self) -> bool;

    /// Whether colors, notes and regions survive a round trip.
    fn preserves_metadata(&self) -> bool;

    /// Serialize populations.
    fn export_to_string(
        &self,
        data: &PopulationData,
        options: &ExportOptions,
    ) -> Result<(String, ExportResult), FormatError>;

    /// Parse populations.
    fn import_from_str(&self, input: &str) -> Result<PopulationData, FormatError>;

    /// Export populations to `path`.
    fn export(
        &self,
        data: &PopulationData,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        let (content, mut result) = self.export_to_string(data, options)?;
        std::fs::write(path, content)?;
        result.files_created.push(path.to_path_buf());
        log::info!(
            "Exported {} populations to {:?} ({})",
            result.populations_exported,
            path,
            self.id()
        );
        Ok(result)
    }

    /// Import populations from `path`.
    fn import(&self, path: &Path) -> Result<PopulationData, FormatError> {
        let content = std::fs::read_to_string(path)?;
        let data = self.import_from_str(&content)?;
        log::info!(
            "Imported {} populations from {:?} ({})",
            data.population_count(),
            path,
            self.id()
        );
        Ok(data)
    }
}

/// Options for export operations.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Whether to export populations that are currently hidden.
    pub include_hidden: bool,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include hidden populations.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_hidden: true,
        }
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of populations written.
    pub populations_exported: usize,

    /// Things that could not be represented in the output.
    pub warnings: Vec<FormatWarning>,

    /// Files created during export.
    pub files_created: Vec<PathBuf>,
}

impl ExportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Warning generated during export.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatWarning {
    /// Dataset the warning relates to (if applicable).
    pub dataset: Option<String>,

    /// Human-readable warning message.
    pub message: String,
}

impl FormatWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            dataset: None,
            message: message.into(),
        }
    }

    /// Set the dataset this warning relates to.
    pub fn with_dataset(mut self, dataset: Option<&str>) -> Self {
        self.dataset = dataset.map(str::to_string);
        self
    }
}
