//! Per-dataset population CSV.
//!
//! One row per (segment, population) membership, no header:
//!
//! ```text
//! 3,CD8 T cells
//! 17,CD8 T cells
//! 17,Proliferating
//! ```
//!
//! Rows whose first cell is not a segment id (a header, for instance) or whose
//! population name is empty are skipped on import.

use crate::format::error::FormatError;
use crate::format::formats::common::exportable;
use crate::format::project::{PopulationData, parse_segment_id, populations_from_groups};
use crate::format::traits::{ExportOptions, ExportResult, PopulationFormat};

/// Segment membership CSV for one dataset.
pub struct PopulationCsvFormat;

impl PopulationFormat for PopulationCsvFormat {
    fn id(&self) -> &'static str {
        "csv"
    }

    fn display_name(&self) -> &'static str {
        "Populations CSV"
    }

    fn extensions(&self) -> &[&'static str] {
        &["csv"]
    }

    fn supports_multiple_datasets(&self) -> bool {
        false
    }

    fn preserves_metadata(&self) -> bool {
        false
    }

    fn export_to_string(
        &self,
        data: &PopulationData,
        options: &ExportOptions,
    ) -> Result<(String, ExportResult), FormatError> {
        if data.datasets.len() > 1 {
            return Err(FormatError::UnsupportedOperation(format!(
                "{} holds one dataset, use the project CSV for {}",
                self.display_name(),
                data.datasets.len()
            )));
        }

        let mut result = ExportResult::new();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        if let Some(dataset) = data.datasets.first() {
            let populations = exportable(
                &dataset.populations,
                dataset.dataset.as_deref(),
                options,
                true,
                &mut result,
            );
            for population in &populations {
                for segment in &population.segments {
                    writer.write_record([segment.to_string().as_str(), population.name.as_str()])?;
                }
            }
            result.populations_exported = populations.len();
        }

        let bytes = writer.into_inner()?;
        Ok((String::from_utf8(bytes)?, result))
    }

    fn import_from_str(&self, input: &str) -> Result<PopulationData, FormatError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input.as_bytes());

        let mut groups = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let segment = record.get(0).and_then(parse_segment_id);
            let name = record.get(1).map(str::trim).unwrap_or_default();
            match segment {
                Some(segment) if !name.is_empty() => {
                    groups.push((name.to_string(), vec![segment]));
                }
                _ => log::debug!("Skipping population CSV row {}: {:?}", line + 1, record),
            }
        }

        Ok(PopulationData::single(populations_from_groups(groups)))
    }
}
