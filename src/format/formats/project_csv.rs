//! Project-wide population CSV.
//!
//! Like the per-dataset CSV with the dataset name as first column:
//!
//! ```text
//! sample_1,3,CD8 T cells
//! sample_2,11,CD8 T cells
//! ```

use std::collections::BTreeMap;

use crate::format::error::FormatError;
use crate::format::formats::common::exportable;
use crate::format::project::{
    DatasetPopulations, PopulationData, parse_segment_id, populations_from_groups,
};
use crate::format::traits::{ExportOptions, ExportResult, FormatWarning, PopulationFormat};
use crate::segmentation::SegmentId;

/// Segment membership CSV for every dataset of a project.
pub struct ProjectCsvFormat;

impl PopulationFormat for ProjectCsvFormat {
    fn id(&self) -> &'static str {
        "project-csv"
    }

    fn display_name(&self) -> &'static str {
        "Project Populations CSV"
    }

    fn extensions(&self) -> &[&'static str] {
        &["csv"]
    }

    fn supports_multiple_datasets(&self) -> bool {
        true
    }

    fn preserves_metadata(&self) -> bool {
        false
    }

    fn export_to_string(
        &self,
        data: &PopulationData,
        options: &ExportOptions,
    ) -> Result<(String, ExportResult), FormatError> {
        let mut result = ExportResult::new();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        for dataset in &data.datasets {
            let Some(name) = dataset.dataset.as_deref() else {
                result.add_warning(FormatWarning::new(format!(
                    "{} populations without a dataset name were not written",
                    dataset.populations.len()
                )));
                continue;
            };

            let populations = exportable(&dataset.populations, Some(name), options, true, &mut result);
            for population in &populations {
                for segment in &population.segments {
                    writer.write_record([name, segment.to_string().as_str(), population.name.as_str()])?;
                }
            }
            result.populations_exported += populations.len();
        }

        let bytes = writer.into_inner()?;
        Ok((String::from_utf8(bytes)?, result))
    }

    fn import_from_str(&self, input: &str) -> Result<PopulationData, FormatError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input.as_bytes());

        // Dataset order follows first appearance
        let mut order: Vec<String> = Vec::new();
        let mut groups: BTreeMap<String, Vec<(String, Vec<SegmentId>)>> = BTreeMap::new();

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let dataset = record.get(0).map(str::trim).unwrap_or_default();
            let segment = record.get(1).and_then(parse_segment_id);
            let name = record.get(2).map(str::trim).unwrap_or_default();

            match segment {
                Some(segment) if !dataset.is_empty() && !name.is_empty() => {
                    if !groups.contains_key(dataset) {
                        order.push(dataset.to_string());
                    }
                    groups
                        .entry(dataset.to_string())
                        .or_default()
                        .push((name.to_string(), vec![segment]));
                }
                _ => log::debug!("Skipping project CSV row {}: {:?}", line + 1, record),
            }
        }

        let datasets = order
            .into_iter()
            .filter_map(|dataset| {
                let rows = groups.remove(&dataset)?;
                Some(DatasetPopulations {
                    dataset: Some(dataset),
                    populations: populations_from_groups(rows),
                })
            })
            .collect();

        Ok(PopulationData { datasets })
    }
}
