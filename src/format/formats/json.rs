//! JSON population format.
//!
//! A JSON array of population records:
//!
//! ```json
//! [
//!   {
//!     "id": "5b0d6f0e-...",
//!     "name": "CD8 T cells",
//!     "notes": null,
//!     "color": [230, 57, 70],
//!     "selectedSegments": [3, 17, 42],
//!     "sourceRegion": [[10.0, 12.5], [40.0, 12.5], [40.0, 60.0]],
//!     "visible": true
//!   }
//! ]
//! ```

use crate::format::error::FormatError;
use crate::format::formats::common::exportable;
use crate::format::project::PopulationData;
use crate::format::traits::{ExportOptions, ExportResult, PopulationFormat};
use crate::model::Population;

/// Full-fidelity population format for one dataset.
pub struct PopulationJsonFormat;

impl PopulationFormat for PopulationJsonFormat {
    fn id(&self) -> &'static str {
        "json"
    }

    fn display_name(&self) -> &'static str {
        "Populations JSON"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn supports_multiple_datasets(&self) -> bool {
        false
    }

    fn preserves_metadata(&self) -> bool {
        true
    }

    fn export_to_string(
        &self,
        data: &PopulationData,
        options: &ExportOptions,
    ) -> Result<(String, ExportResult), FormatError> {
        if data.datasets.len() > 1 {
            return Err(FormatError::UnsupportedOperation(format!(
                "{} holds one dataset, got {}",
                self.display_name(),
                data.datasets.len()
            )));
        }

        let mut result = ExportResult::new();
        let populations: Vec<&Population> = match data.datasets.first() {
            Some(dataset) => exportable(
                &dataset.populations,
                dataset.dataset.as_deref(),
                options,
                false,
                &mut result,
            ),
            None => Vec::new(),
        };
        result.populations_exported = populations.len();

        Ok((serde_json::to_string_pretty(&populations)?, result))
    }

    fn import_from_str(&self, input: &str) -> Result<PopulationData, FormatError> {
        let populations: Vec<Population> = serde_json::from_str(input)?;
        Ok(PopulationData::single(populations))
    }
}
