//! Format-agnostic population data for import/export.
//!
//! Single-dataset formats read and write one `DatasetPopulations` without a
//! dataset name; project-wide formats key every group by dataset name.

use std::collections::BTreeMap;

use crate::color_utils::random_color;
use crate::model::Population;
use crate::segmentation::SegmentId;

/// Populations of one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetPopulations {
    /// Dataset (directory) name; `None` for single-dataset files
    pub dataset: Option<String>,
    pub populations: Vec<Population>,
}

/// Populations of one or more datasets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationData {
    pub datasets: Vec<DatasetPopulations>,
}

impl PopulationData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data for a single unnamed dataset.
    pub fn single(populations: Vec<Population>) -> Self {
        Self {
            datasets: vec![DatasetPopulations {
                dataset: None,
                populations,
            }],
        }
    }

    /// Add the populations of a named dataset.
    pub fn with_dataset(mut self, name: impl Into<String>, populations: Vec<Population>) -> Self {
        self.datasets.push(DatasetPopulations {
            dataset: Some(name.into()),
            populations,
        });
        self
    }

    /// Populations of the named dataset.
    pub fn for_dataset(&self, name: &str) -> Option<&[Population]> {
        self.datasets
            .iter()
            .find(|d| d.dataset.as_deref() == Some(name))
            .map(|d| d.populations.as_slice())
    }

    /// All populations, regardless of dataset.
    pub fn into_populations(self) -> Vec<Population> {
        self.datasets
            .into_iter()
            .flat_map(|d| d.populations)
            .collect()
    }

    pub fn population_count(&self) -> usize {
        self.datasets.iter().map(|d| d.populations.len()).sum()
    }
}

/// Build populations from `(name, segment ids)` groups, in first-seen name
/// order, with random colors.
pub fn populations_from_groups(groups: Vec<(String, Vec<SegmentId>)>) -> Vec<Population> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: BTreeMap<String, Vec<SegmentId>> = BTreeMap::new();
    for (name, segments) in groups {
        if !merged.contains_key(&name) {
            order.push(name.clone());
        }
        merged.entry(name).or_default().extend(segments);
    }

    order
        .into_iter()
        .filter_map(|name| {
            let segments = merged.remove(&name)?;
            Some(Population::new(name, random_color(), segments))
        })
        .collect()
}

/// Parse a segment id cell. Accepts whole non-negative numbers ("12", "12.0").
pub fn parse_segment_id(cell: &str) -> Option<SegmentId> {
    let value: f64 = cell.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then_some(value as SegmentId)
}
