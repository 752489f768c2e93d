//! Population selections: named, colored sets of segment ids.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::color_utils::{deserialize_color, random_color};
use crate::constants::SELECTION_NAME_PREFIX;
use crate::segmentation::SegmentId;

/// Opaque population identifier.
pub type PopulationId = String;

fn default_visible() -> bool {
    true
}

/// A named subset of a dataset's segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Population {
    pub id: PopulationId,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// RGB display color; packed `0xRRGGBB` numbers are accepted on import
    #[serde(deserialize_with = "deserialize_color")]
    pub color: [u8; 3],
    #[serde(rename = "selectedSegments")]
    pub segments: BTreeSet<SegmentId>,
    /// Polygon the selection was drawn with, in image coordinates
    #[serde(default)]
    pub source_region: Option<Vec<[f32; 2]>>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl Population {
    pub fn new(name: impl Into<String>, color: [u8; 3], segments: impl IntoIterator<Item = SegmentId>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            notes: None,
            color,
            segments: segments.into_iter().collect(),
            source_region: None,
            visible: true,
        }
    }

    pub fn contains(&self, segment: SegmentId) -> bool {
        self.segments.contains(&segment)
    }
}

/// The populations of one dataset.
///
/// Mutations address one population by id and leave every other entry
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct PopulationStore {
    populations: Vec<Population>,
    highlighted: Option<PopulationId>,
}

impl PopulationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a population from segment ids.
    ///
    /// The name defaults to "Selection N" (N = current count + 1) and the
    /// color to a random one.
    pub fn create_from_segments(
        &mut self,
        segments: impl IntoIterator<Item = SegmentId>,
        name: Option<String>,
        color: Option<[u8; 3]>,
    ) -> PopulationId {
        let name = name.unwrap_or_else(|| self.next_default_name());
        let population = Population::new(name, color.unwrap_or_else(random_color), segments);
        log::debug!(
            "Created population '{}' with {} segments",
            population.name,
            population.segments.len()
        );
        let id = population.id.clone();
        self.populations.push(population);
        id
    }

    /// Create a population that remembers the region it was selected with.
    pub fn create_from_region(
        &mut self,
        region: Vec<[f32; 2]>,
        segments: impl IntoIterator<Item = SegmentId>,
        name: Option<String>,
        color: Option<[u8; 3]>,
    ) -> PopulationId {
        let id = self.create_from_segments(segments, name, color);
        if let Some(population) = self.get_mut(&id) {
            population.source_region = Some(region);
        }
        id
    }

    fn next_default_name(&self) -> String {
        format!("{} {}", SELECTION_NAME_PREFIX, self.populations.len() + 1)
    }

    pub fn get(&self, id: &str) -> Option<&Population> {
        self.populations.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Population> {
        self.populations.iter_mut().find(|p| p.id == id)
    }

    fn update(&mut self, id: &str, f: impl FnOnce(&mut Population)) -> bool {
        match self.get_mut(id) {
            Some(population) => {
                f(population);
                true
            }
            None => {
                log::warn!("Population {} not found", id);
                false
            }
        }
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update(id, |p| p.name = name)
    }

    pub fn set_notes(&mut self, id: &str, notes: Option<String>) -> bool {
        self.update(id, |p| p.notes = notes)
    }

    pub fn set_color(&mut self, id: &str, color: [u8; 3]) -> bool {
        self.update(id, |p| p.color = color)
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        self.update(id, |p| p.visible = visible)
    }

    pub fn set_segments(&mut self, id: &str, segments: impl IntoIterator<Item = SegmentId>) -> bool {
        let segments: BTreeSet<SegmentId> = segments.into_iter().collect();
        self.update(id, |p| p.segments = segments)
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        for population in &mut self.populations {
            population.visible = visible;
        }
    }

    /// Remove a population. Clears the highlight if it pointed at it.
    pub fn delete(&mut self, id: &str) -> Option<Population> {
        let pos = self.populations.iter().position(|p| p.id == id)?;
        if self.highlighted.as_deref() == Some(id) {
            self.highlighted = None;
        }
        Some(self.populations.remove(pos))
    }

    pub fn highlight(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.highlighted = Some(id.to_string());
        true
    }

    pub fn unhighlight(&mut self) {
        self.highlighted = None;
    }

    pub fn highlighted(&self) -> Option<&Population> {
        self.highlighted.as_deref().and_then(|id| self.get(id))
    }

    /// Replace every population. Returns `false` (and keeps the current
    /// list) when `populations` equals it.
    pub fn replace_all(&mut self, populations: Vec<Population>) -> bool {
        if self.populations == populations {
            return false;
        }
        self.populations = populations;
        if self
            .highlighted
            .as_deref()
            .is_some_and(|id| self.get(id).is_none())
        {
            self.highlighted = None;
        }
        true
    }

    /// Add populations read from a file, keeping their ids when present
    /// and not already used.
    pub fn import(&mut self, populations: impl IntoIterator<Item = Population>) -> usize {
        let mut added = 0;
        for mut population in populations {
            if population.id.is_empty() || self.get(&population.id).is_some() {
                population.id = uuid::Uuid::new_v4().to_string();
            }
            self.populations.push(population);
            added += 1;
        }
        log::info!("Imported {} populations", added);
        added
    }

    /// Names of the populations containing `segment`, in store order.
    pub fn names_containing(&self, segment: SegmentId) -> Vec<&str> {
        self.populations
            .iter()
            .filter(|p| p.contains(segment))
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Population> {
        self.populations.iter()
    }

    pub fn as_slice(&self) -> &[Population] {
        &self.populations
    }

    pub fn len(&self) -> usize {
        self.populations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.populations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names_increment() {
        let mut store = PopulationStore::new();
        let first = store.create_from_segments([1, 2], None, None);
        let second = store.create_from_segments([3], None, Some([1, 2, 3]));
        assert_eq!(store.get(&first).unwrap().name, "Selection 1");
        assert_eq!(store.get(&second).unwrap().name, "Selection 2");
        assert_eq!(store.get(&second).unwrap().color, [1, 2, 3]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_mutations_leave_others_unchanged() {
        let mut store = PopulationStore::new();
        let a = store.create_from_segments([1], Some("T cells".into()), None);
        let b = store.create_from_segments([2], Some("B cells".into()), None);
        let before_b = store.get(&b).unwrap().clone();

        assert!(store.rename(&a, "CD4 T cells"));
        assert!(store.set_notes(&a, Some("gated on CD3".into())));
        assert!(store.set_color(&a, [255, 0, 0]));
        assert!(store.set_visible(&a, false));

        let updated = store.get(&a).unwrap();
        assert_eq!(updated.name, "CD4 T cells");
        assert_eq!(updated.notes.as_deref(), Some("gated on CD3"));
        assert!(!updated.visible);
        assert_eq!(store.get(&b).unwrap(), &before_b);

        assert!(!store.rename("missing", "x"));
    }

    #[test]
    fn test_delete_clears_highlight() {
        let mut store = PopulationStore::new();
        let a = store.create_from_segments([1], None, None);
        let b = store.create_from_segments([2], None, None);
        assert!(store.highlight(&a));
        assert_eq!(store.highlighted().unwrap().id, a);

        let removed = store.delete(&a).unwrap();
        assert_eq!(removed.id, a);
        assert!(store.highlighted().is_none());
        assert_eq!(store.len(), 1);
        assert!(store.get(&b).is_some());
        assert!(store.delete(&a).is_none());
    }

    #[test]
    fn test_replace_all_only_when_different() {
        let mut store = PopulationStore::new();
        store.create_from_segments([1], None, None);
        let same = store.as_slice().to_vec();
        assert!(!store.replace_all(same));
        assert!(store.replace_all(Vec::new()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_names_containing_and_visibility() {
        let mut store = PopulationStore::new();
        store.create_from_segments([1, 2], Some("A".into()), None);
        store.create_from_segments([2], Some("B".into()), None);
        assert_eq!(store.names_containing(2), vec!["A", "B"]);
        assert!(store.names_containing(3).is_empty());

        store.set_all_visible(false);
        assert!(store.iter().all(|p| !p.visible));
    }

    #[test]
    fn test_import_regenerates_duplicate_ids() {
        let mut store = PopulationStore::new();
        let existing = store.create_from_segments([1], None, None);
        let mut clash = Population::new("Imported", [0, 0, 0], [5]);
        clash.id = existing.clone();
        assert_eq!(store.import(vec![clash]), 1);
        assert_eq!(store.len(), 2);
        assert_ne!(store.as_slice()[1].id, existing);
    }

    #[test]
    fn test_region_is_kept() {
        let mut store = PopulationStore::new();
        let id = store.create_from_region(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]], [7], None, None);
        assert_eq!(store.get(&id).unwrap().source_region.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_json_field_names() {
        let population = Population::new("A", [1, 2, 3], [4, 2]);
        let json = serde_json::to_value(&population).unwrap();
        assert_eq!(json["selectedSegments"], serde_json::json!([2, 4]));
        assert!(json.get("sourceRegion").is_some());
    }
}
