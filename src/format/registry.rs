//! Format registry for discovering and accessing population formats.

use std::collections::HashMap;

use crate::format::formats::{PopulationCsvFormat, PopulationJsonFormat, ProjectCsvFormat};
use crate::format::traits::PopulationFormat;

/// Registry of available population formats.
///
/// All built-in formats are registered automatically on creation.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn PopulationFormat>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: HashMap::new(),
        };

        registry.register(Box::new(PopulationJsonFormat));
        registry.register(Box::new(PopulationCsvFormat));
        registry.register(Box::new(ProjectCsvFormat));

        registry
    }

    /// Register a format implementation.
    pub fn register(&mut self, format: Box<dyn PopulationFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn PopulationFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Find formats by file extension.
    pub fn by_extension(&self, ext: &str) -> Vec<&dyn PopulationFormat> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        let mut formats: Vec<&dyn PopulationFormat> = self
            .formats
            .values()
            .filter(|f| f.extensions().iter().any(|e| *e == ext))
            .map(|f| f.as_ref())
            .collect();
        formats.sort_by_key(|f| f.id());
        formats
    }

    /// Get all registered formats, sorted by ID.
    pub fn all(&self) -> Vec<&dyn PopulationFormat> {
        let mut formats: Vec<&dyn PopulationFormat> =
            self.formats.values().map(|f| f.as_ref()).collect();
        formats.sort_by_key(|f| f.id());
        formats
    }

    /// Get all format IDs, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.formats.keys().copied().collect();
        ids.sort();
        ids
    }

    /// The full-fidelity JSON format.
    pub fn native(&self) -> &dyn PopulationFormat {
        self.get("json").unwrap_or(&PopulationJsonFormat)
    }

    /// Formats that hold several datasets in one file.
    pub fn project_formats(&self) -> Vec<&dyn PopulationFormat> {
        self.all()
            .into_iter()
            .filter(|f| f.supports_multiple_datasets())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats() {
        let registry = FormatRegistry::new();
        assert_eq!(registry.ids(), vec!["csv", "json", "project-csv"]);
        assert!(registry.get("fcs").is_none());
    }

    #[test]
    fn test_native_format() {
        let registry = FormatRegistry::new();
        let native = registry.native();
        assert_eq!(native.id(), "json");
        assert!(native.preserves_metadata());
    }

    #[test]
    fn test_by_extension() {
        let registry = FormatRegistry::new();
        let csv: Vec<&str> = registry.by_extension(".CSV").iter().map(|f| f.id()).collect();
        assert_eq!(csv, vec!["csv", "project-csv"]);
    }

    #[test]
    fn test_project_formats() {
        let registry = FormatRegistry::new();
        let ids: Vec<&str> = registry.project_formats().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["project-csv"]);
    }
}
