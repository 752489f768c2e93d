//! Tests for the JSON population format.

use crate::format::formats::PopulationJsonFormat;
use crate::format::project::PopulationData;
use crate::format::traits::{ExportOptions, PopulationFormat};
use crate::model::Population;

#[test]
fn test_import_minimal_records() {
    // notes, sourceRegion and visible are optional
    let input = r#"[
        {"id": "p1", "name": "T cells", "color": [255, 0, 0], "selectedSegments": [4, 1, 4]}
    ]"#;
    let data = PopulationJsonFormat.import_from_str(input).unwrap();
    let populations = data.into_populations();
    assert_eq!(populations.len(), 1);
    let population = &populations[0];
    assert_eq!(population.id, "p1");
    assert!(population.visible);
    assert!(population.notes.is_none());
    assert_eq!(population.segments.iter().copied().collect::<Vec<_>>(), vec![1, 4]);
}

#[test]
fn test_import_packed_color() {
    let input = r#"[
        {"id": "p1", "name": "B cells", "color": 15087942, "selectedSegments": [2]}
    ]"#;
    let populations = PopulationJsonFormat.import_from_str(input).unwrap().into_populations();
    assert_eq!(populations[0].color, [0xe6, 0x39, 0x46]);
}

#[test]
fn test_import_invalid_json() {
    assert!(PopulationJsonFormat.import_from_str("{not json").is_err());
    assert!(PopulationJsonFormat.import_from_str(r#"{"name": "x"}"#).is_err());
}

#[test]
fn test_export_skips_hidden_when_requested() {
    let mut hidden = Population::new("Hidden", [0, 0, 0], [1]);
    hidden.visible = false;
    let shown = Population::new("Shown", [0, 0, 0], [2]);
    let data = PopulationData::single(vec![hidden, shown]);

    let options = ExportOptions::new().include_hidden(false);
    let (json, result) = PopulationJsonFormat.export_to_string(&data, &options).unwrap();
    assert_eq!(result.populations_exported, 1);
    assert!(json.contains("Shown"));
    assert!(!json.contains("Hidden"));
}

#[test]
fn test_export_rejects_several_datasets() {
    let data = PopulationData::new()
        .with_dataset("a", Vec::new())
        .with_dataset("b", Vec::new());
    assert!(PopulationJsonFormat
        .export_to_string(&data, &ExportOptions::default())
        .is_err());
}
