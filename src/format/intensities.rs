//! Per-segment marker intensity table and its CSV encoding.
//!
//! One row per segment of the dataset:
//!
//! ```text
//! Segment ID,CD3,CD8,Centroid X,Centroid Y,Populations
//! 1,12.5,3.25,10.5,4,"T cells,CD3+"
//! ```

use std::io::Write;
use std::path::Path;

use crate::format::error::FormatError;
use crate::model::PopulationStore;
use crate::segmentation::{SegmentId, SegmentIndex};
use crate::statistics::StatisticsResult;

/// One segment's row.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityRow {
    pub segment: SegmentId,
    /// One value per channel column; `None` when the channel has no value
    pub values: Vec<Option<f64>>,
    pub centroid_x: f64,
    pub centroid_y: f64,
    /// Names of the populations containing the segment
    pub populations: Vec<String>,
}

/// Statistic values of every segment over a list of channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntensityTable {
    pub channels: Vec<String>,
    pub rows: Vec<IntensityRow>,
}

impl IntensityTable {
    /// Build the table from computed statistics, one result per channel column.
    pub fn build(
        segments: &SegmentIndex,
        columns: &[&StatisticsResult],
        populations: Option<&PopulationStore>,
    ) -> Self {
        let channels = columns.iter().map(|r| r.key.channel.clone()).collect();

        let rows = segments
            .iter()
            .map(|segment| {
                let (centroid_x, centroid_y) = segment
                    .centroid
                    .map_or((f64::NAN, f64::NAN), |c| (c.x, c.y));
                IntensityRow {
                    segment: segment.id,
                    values: columns.iter().map(|r| r.get(segment.id)).collect(),
                    centroid_x,
                    centroid_y,
                    populations: populations
                        .map(|p| {
                            p.names_containing(segment.id)
                                .into_iter()
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect();

        Self { channels, rows }
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.channels.len() + 4);
        header.push("Segment ID".to_string());
        header.extend(self.channels.iter().cloned());
        header.push("Centroid X".to_string());
        header.push("Centroid Y".to_string());
        header.push("Populations".to_string());
        header
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), FormatError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(self.header())?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 4);
            record.push(row.segment.to_string());
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            record.push(row.centroid_x.to_string());
            record.push(row.centroid_y.to_string());
            record.push(row.populations.join(","));
            out.write_record(&record)?;
        }

        out.flush()?;
        Ok(())
    }

    /// Write the table as CSV to `path`.
    pub fn save_csv(&self, path: &Path) -> Result<(), FormatError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        log::info!(
            "Exported intensities of {} segments x {} channels to {:?}",
            self.rows.len(),
            self.channels.len(),
            path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::segmentation::SegmentIndexBuilder;
    use crate::statistics::{StatisticKey, StatisticKind};

    fn result(channel: &str, values: &[(SegmentId, f64)]) -> StatisticsResult {
        StatisticsResult {
            key: StatisticKey::new(channel, StatisticKind::Mean),
            values: values.iter().copied().collect::<BTreeMap<_, _>>(),
            min_max: None,
        }
    }

    #[test]
    fn test_csv_output() {
        let segments = SegmentIndexBuilder::from_labels(2, 2, vec![1, 1, 2, 0]).unwrap();
        let cd3 = result("CD3", &[(1, 2.5), (2, 4.0)]);
        let cd8 = result("CD8", &[(1, 1.0)]);

        let mut populations = PopulationStore::new();
        populations.create_from_segments([1, 2], Some("All".into()), None);
        populations.create_from_segments([1], Some("T cells".into()), None);

        let table = IntensityTable::build(&segments, &[&cd3, &cd8], Some(&populations));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].populations, vec!["All", "T cells"]);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Segment ID,CD3,CD8,Centroid X,Centroid Y,Populations");
        assert_eq!(lines[1], "1,2.5,1,0.5,0,\"All,T cells\"");
        assert_eq!(lines[2], "2,4,,0,1,All");
    }

    #[test]
    fn test_empty_segmentation() {
        let segments = SegmentIndexBuilder::from_labels(1, 1, vec![0]).unwrap();
        let table = IntensityTable::build(&segments, &[], None);
        assert!(table.rows.is_empty());
        assert_eq!(table.header().len(), 4);
    }
}
