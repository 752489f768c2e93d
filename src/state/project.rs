//! Project state: the ordered datasets of one project directory, their
//! populations and the statistics workers.
//!
//! `Project` is the single owner of every mutable piece of state. Worker
//! threads only ever hand results back through the decoder and statistics
//! dispatcher; `pump` (or one of the blocking queries) installs them and then
//! runs every continuation registered with `when` whose condition now holds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cache::DatasetCache;
use super::dataset::{Dataset, DatasetId, dataset_name};
use super::error::{CacheError, ProjectError};
use super::reactions::Reactions;
use super::worker_pool::Ticket;
use crate::config::Preferences;
use crate::data::{ChannelSource, FileMaskSource, FolderChannelSource, MaskSource};
use crate::format::{
    ExportOptions, ExportResult, FormatRegistry, IntensityTable, PopulationData, PopulationFormat,
};
use crate::model::{PopulationId, PopulationStore};
use crate::segmentation::SegmentId;
use crate::statistics::{StatisticKind, StatisticsError, StatisticsJobDispatcher, StatisticsResult};

pub struct Project {
    cache: DatasetCache,
    dispatcher: StatisticsJobDispatcher,
    /// Populations per dataset; kept across unloads
    populations: HashMap<DatasetId, PopulationStore>,
    reactions: Reactions<Project>,
    /// Dataset that was active before the current one
    last_active: Option<DatasetId>,
    default_statistic: StatisticKind,
    formats: FormatRegistry,
}

/// Record for `id` if it holds decoded buffers.
fn loaded_dataset<'a>(cache: &'a mut DatasetCache, id: &Path) -> Result<&'a mut Dataset, CacheError> {
    let dataset = cache
        .get_mut(id)
        .ok_or_else(|| CacheError::UnknownDataset(id.to_path_buf()))?;
    if !dataset.is_loaded() {
        return Err(CacheError::NotLoaded);
    }
    Ok(dataset)
}

/// Record for `id` if it is loaded with a segmentation.
fn segmented_dataset<'a>(cache: &'a mut DatasetCache, id: &Path) -> Result<&'a mut Dataset, CacheError> {
    let dataset = loaded_dataset(cache, id)?;
    if dataset.segmentation().is_none() {
        return Err(CacheError::NoSegmentation);
    }
    Ok(dataset)
}

impl Project {
    /// Create an empty project reading datasets from disk.
    pub fn new(preferences: &Preferences) -> Result<Self, ProjectError> {
        Self::with_sources(
            preferences,
            Arc::new(FolderChannelSource::new()),
            Arc::new(FileMaskSource::new()),
        )
    }

    /// Create an empty project with custom channel and mask sources.
    pub fn with_sources(
        preferences: &Preferences,
        channel_source: Arc<dyn ChannelSource>,
        mask_source: Arc<dyn MaskSource>,
    ) -> Result<Self, ProjectError> {
        let threads = preferences.threads();
        let mut cache = DatasetCache::new(
            preferences.max_resident(),
            threads,
            channel_source,
            mask_source,
        )?;
        cache.set_segmentation_basename(preferences.segmentation_basename.clone())?;

        log::debug!(
            "Project created: {} resident datasets, {} worker threads",
            cache.max_resident(),
            threads
        );

        Ok(Self {
            cache,
            dispatcher: StatisticsJobDispatcher::new(threads)?,
            populations: HashMap::new(),
            reactions: Reactions::new(),
            last_active: None,
            default_statistic: preferences.default_statistic,
            formats: FormatRegistry::new(),
        })
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn dispatcher(&self) -> &StatisticsJobDispatcher {
        &self.dispatcher
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn default_statistic(&self) -> StatisticKind {
        self.default_statistic
    }

    /// Dataset ids in project order.
    pub fn dataset_ids(&self) -> &[DatasetId] {
        self.cache.ids()
    }

    pub fn dataset(&self, id: &Path) -> Option<&Dataset> {
        self.cache.get(id)
    }

    pub fn active(&self) -> Option<&Path> {
        self.cache.active()
    }

    pub fn is_loaded(&self, id: &Path) -> bool {
        self.cache.get(id).is_some_and(Dataset::is_loaded)
    }

    // ---- Navigation ----

    /// Replace the project with every sub-directory of `dir` (sorted) and
    /// activate the first. Returns the number of datasets.
    pub fn open_project(&mut self, dir: &Path) -> Result<usize, ProjectError> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        self.cache.clear();
        self.populations.clear();
        self.last_active = None;

        for path in &dirs {
            self.cache.insert(path.clone());
        }
        log::info!("Opened project {:?} with {} datasets", dir, dirs.len());

        if let Some(first) = dirs.first() {
            self.activate(first)?;
        }
        Ok(dirs.len())
    }

    /// Add a single dataset directory to the project and activate it.
    pub fn open_dataset(&mut self, dir: &Path) -> Result<(), ProjectError> {
        self.cache.insert(dir.to_path_buf());
        self.activate(dir)
    }

    /// Activate `id`, loading it in the background if needed.
    pub fn activate(&mut self, id: &Path) -> Result<(), ProjectError> {
        let previous = self.current().filter(|c| *c != id).map(Path::to_path_buf);
        if previous.is_some() {
            self.last_active = previous;
        }
        self.cache.activate(id)?;
        self.fire_reactions();
        Ok(())
    }

    /// The dataset being shown: the one being activated, else the active one.
    fn current(&self) -> Option<&Path> {
        self.cache.activating().or_else(|| self.cache.active())
    }

    fn step(&mut self, forward: bool) -> Result<Option<DatasetId>, ProjectError> {
        let ids = self.cache.ids();
        if ids.is_empty() {
            return Ok(None);
        }
        let next = match self.current().and_then(|c| ids.iter().position(|id| id == c)) {
            Some(pos) if forward => (pos + 1) % ids.len(),
            Some(pos) => (pos + ids.len() - 1) % ids.len(),
            None => 0,
        };
        let id = ids[next].clone();
        self.activate(&id)?;
        Ok(Some(id))
    }

    /// Activate the next dataset, wrapping around at the end.
    pub fn next_dataset(&mut self) -> Result<Option<DatasetId>, ProjectError> {
        self.step(true)
    }

    /// Activate the previous dataset, wrapping around at the start.
    pub fn previous_dataset(&mut self) -> Result<Option<DatasetId>, ProjectError> {
        self.step(false)
    }

    /// Drop the current dataset and its populations from the project.
    ///
    /// Activates the previously active dataset if it is still part of the
    /// project, otherwise the first one. Returns the removed id.
    pub fn remove_active_dataset(&mut self) -> Result<Option<DatasetId>, ProjectError> {
        let Some(id) = self.current().map(Path::to_path_buf) else {
            return Ok(None);
        };
        self.cache.remove(&id);
        self.populations.remove(&id);

        let fallback = self
            .last_active
            .take()
            .filter(|last| *last != id && self.cache.get(last).is_some())
            .or_else(|| self.cache.ids().first().cloned());
        if let Some(fallback) = fallback {
            self.activate(&fallback)?;
        }
        Ok(Some(id))
    }

    // ---- Segmentation ----

    /// Look up `basename` inside every dataset directory as its mask.
    pub fn set_segmentation_basename(&mut self, basename: Option<String>) -> Result<(), ProjectError> {
        self.cache.set_segmentation_basename(basename)?;
        Ok(())
    }

    /// Use `path` as the mask of one dataset, reloading it if resident.
    pub fn set_segmentation_file(&mut self, id: &Path, path: Option<PathBuf>) -> Result<(), ProjectError> {
        self.cache.set_segmentation_file(id, path)?;
        Ok(())
    }

    /// Drop the segmentation of `id` and every statistic computed from it.
    pub fn clear_segmentation(&mut self, id: &Path) -> Result<(), CacheError> {
        let dataset = self
            .cache
            .get_mut(id)
            .ok_or_else(|| CacheError::UnknownDataset(id.to_path_buf()))?;
        dataset.set_segmentation_file(None);
        dataset.clear_segmentation();
        log::info!("Cleared segmentation of {:?}", id);
        Ok(())
    }

    // ---- Worker results and continuations ----

    /// Install finished decodes and statistics jobs, then run ready
    /// continuations. Returns the datasets that became `Loaded`.
    pub fn pump(&mut self) -> Vec<DatasetId> {
        let loaded = self.cache.poll();

        while let Some(completion) = self.dispatcher.try_take() {
            let ticket = completion.ticket;
            match self
                .cache
                .iter_mut()
                .find(|d| d.statistics.is_waiting_for(ticket))
            {
                Some(dataset) => {
                    dataset.statistics.commit(completion);
                }
                None => log::debug!("Discarding statistics result {} with no owner", ticket),
            }
        }

        self.fire_reactions();
        loaded
    }

    /// Run `action` once `condition` holds. Runs it right away if it already
    /// does.
    pub fn when(
        &mut self,
        condition: impl Fn(&Project) -> bool + 'static,
        action: impl FnOnce(&mut Project) + 'static,
    ) {
        self.reactions.when(condition, action);
        self.fire_reactions();
    }

    /// Continuations still waiting for their condition.
    pub fn pending_reactions(&self) -> usize {
        self.reactions.len()
    }

    fn fire_reactions(&mut self) {
        loop {
            let mut reactions = std::mem::take(&mut self.reactions);
            let ready = reactions.take_ready(self);
            // Continuations registered while `self.reactions` was taken
            reactions.append(&mut self.reactions);
            self.reactions = reactions;

            if ready.is_empty() {
                break;
            }
            for action in ready {
                action(self);
            }
        }
    }

    /// Block until `id` finished loading. Returns whether it is `Loaded`.
    pub fn wait_until_loaded(&mut self, id: &Path) -> Result<bool, ProjectError> {
        let loaded = self.cache.wait_until_loaded(id)?;
        self.fire_reactions();
        Ok(loaded)
    }

    // ---- Statistics ----

    /// Queue `(channel, kind)` of `id` without blocking. `Ok(None)` means the
    /// values are already cached.
    pub fn request_statistics(
        &mut self,
        id: &Path,
        channel: &str,
        kind: StatisticKind,
    ) -> Result<Option<Ticket>, StatisticsError> {
        self.cache.accessed(id);
        let dataset = segmented_dataset(&mut self.cache, id)?;
        dataset.statistics.request(channel, kind, &mut self.dispatcher)
    }

    /// Statistic of one segment, computing the channel on first use.
    pub fn value_for(
        &mut self,
        id: &Path,
        channel: &str,
        kind: StatisticKind,
        segment: SegmentId,
    ) -> Result<Option<f64>, StatisticsError> {
        self.cache.accessed(id);
        let dataset = segmented_dataset(&mut self.cache, id)?;
        dataset
            .statistics
            .value_for(channel, kind, segment, &mut self.dispatcher)
    }

    pub fn values_for(
        &mut self,
        id: &Path,
        channel: &str,
        kind: StatisticKind,
        segments: &[SegmentId],
    ) -> Result<Vec<Option<f64>>, StatisticsError> {
        self.cache.accessed(id);
        let dataset = segmented_dataset(&mut self.cache, id)?;
        dataset
            .statistics
            .values_for(channel, kind, segments, &mut self.dispatcher)
    }

    /// Segments of `id` whose statistic lies in `[min, max]`, ascending.
    pub fn segments_in_range(
        &mut self,
        id: &Path,
        channel: &str,
        min: f64,
        max: f64,
        use_mean: bool,
    ) -> Result<Vec<SegmentId>, StatisticsError> {
        self.cache.accessed(id);
        let dataset = segmented_dataset(&mut self.cache, id)?;
        dataset
            .statistics
            .segments_in_range(channel, min, max, use_mean, &mut self.dispatcher)
    }

    // ---- Populations ----

    pub fn populations(&self, id: &Path) -> Option<&PopulationStore> {
        self.populations.get(id)
    }

    /// Populations of a dataset of the project, created on first use.
    pub fn populations_mut(&mut self, id: &Path) -> Option<&mut PopulationStore> {
        self.cache.get(id)?;
        Some(self.populations.entry(id.to_path_buf()).or_default())
    }

    pub fn add_population_from_segments(
        &mut self,
        id: &Path,
        segments: impl IntoIterator<Item = SegmentId>,
        name: Option<String>,
        color: Option<[u8; 3]>,
    ) -> Result<PopulationId, CacheError> {
        let store = self
            .populations_mut(id)
            .ok_or_else(|| CacheError::UnknownDataset(id.to_path_buf()))?;
        Ok(store.create_from_segments(segments, name, color))
    }

    /// Create a population from the segments whose statistic lies in
    /// `[min, max]`. `Ok(None)` when no segment qualifies.
    pub fn add_population_from_range(
        &mut self,
        id: &Path,
        channel: &str,
        min: f64,
        max: f64,
        use_mean: bool,
        name: Option<String>,
    ) -> Result<Option<PopulationId>, ProjectError> {
        let segments = self.segments_in_range(id, channel, min, max, use_mean)?;
        if segments.is_empty() {
            log::debug!("No segments of {:?} with {} in [{}, {}]", id, channel, min, max);
            return Ok(None);
        }
        Ok(Some(self.add_population_from_segments(id, segments, name, None)?))
    }

    // ---- Export / import ----

    /// Per-segment statistics of `channels` (every channel when `None`).
    pub fn intensity_table(
        &mut self,
        id: &Path,
        channels: Option<&[String]>,
        kind: StatisticKind,
    ) -> Result<IntensityTable, ProjectError> {
        self.cache.accessed(id);
        let dataset = segmented_dataset(&mut self.cache, id)?;
        let segments = dataset
            .segmentation()
            .map(Arc::clone)
            .ok_or(CacheError::NoSegmentation)?;
        let names = match channels {
            Some(channels) => channels.to_vec(),
            None => dataset.channels().map(|c| c.names()).unwrap_or_default(),
        };

        // Queue everything first so channels are computed in parallel
        for name in &names {
            dataset.statistics.request(name, kind, &mut self.dispatcher)?;
        }
        for name in &names {
            dataset.statistics.compute(name, kind, &mut self.dispatcher)?;
        }

        let columns: Vec<&StatisticsResult> = names
            .iter()
            .filter_map(|name| dataset.statistics.result(name, kind))
            .collect();
        Ok(IntensityTable::build(
            &segments,
            &columns,
            self.populations.get(id),
        ))
    }

    /// Write the intensity table of `id` as CSV.
    pub fn export_intensities(
        &mut self,
        id: &Path,
        channels: Option<&[String]>,
        kind: StatisticKind,
        path: &Path,
    ) -> Result<(), ProjectError> {
        let table = self.intensity_table(id, channels, kind)?;
        table.save_csv(path)?;
        Ok(())
    }

    fn format(&self, format_id: &str) -> Result<&dyn PopulationFormat, ProjectError> {
        self.formats
            .get(format_id)
            .ok_or_else(|| ProjectError::UnknownFormat(format_id.to_string()))
    }

    /// Export the populations of one dataset.
    pub fn export_populations(
        &self,
        id: &Path,
        format_id: &str,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, ProjectError> {
        let format = self.format(format_id)?;
        let populations = self
            .populations
            .get(id)
            .map(|store| store.as_slice().to_vec())
            .unwrap_or_default();

        let data = if format.supports_multiple_datasets() {
            PopulationData::new().with_dataset(dataset_name(id), populations)
        } else {
            PopulationData::single(populations)
        };
        Ok(format.export(&data, path, options)?)
    }

    /// Export the populations of every dataset into one file.
    pub fn export_project_populations(
        &self,
        format_id: &str,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportResult, ProjectError> {
        let format = self.format(format_id)?;
        if !format.supports_multiple_datasets() {
            return Err(crate::format::FormatError::UnsupportedOperation(format!(
                "{} holds a single dataset",
                format.display_name()
            ))
            .into());
        }

        let data = self.cache.ids().iter().fold(PopulationData::new(), |data, id| {
            let populations = self
                .populations
                .get(id)
                .map(|store| store.as_slice().to_vec())
                .unwrap_or_default();
            data.with_dataset(dataset_name(id), populations)
        });
        Ok(format.export(&data, path, options)?)
    }

    /// Import populations into one dataset. Returns how many were added.
    pub fn import_populations(
        &mut self,
        id: &Path,
        format_id: &str,
        path: &Path,
    ) -> Result<usize, ProjectError> {
        let data = self.format(format_id)?.import(path)?;
        let store = self
            .populations_mut(id)
            .ok_or_else(|| CacheError::UnknownDataset(id.to_path_buf()))?;
        Ok(store.import(data.into_populations()))
    }

    /// Import a project-wide file, matching its groups to datasets by
    /// directory name. Returns how many populations were added.
    pub fn import_project_populations(
        &mut self,
        format_id: &str,
        path: &Path,
    ) -> Result<usize, ProjectError> {
        let data = self.format(format_id)?.import(path)?;

        let mut imported = 0;
        for group in data.datasets {
            let Some(name) = group.dataset else {
                log::warn!("Skipping {} populations without a dataset name", group.populations.len());
                continue;
            };
            let Some(id) = self
                .cache
                .ids()
                .iter()
                .find(|id| dataset_name(id) == name)
                .cloned()
            else {
                log::warn!("No dataset named {:?} in the project", name);
                continue;
            };
            imported += self
                .populations
                .entry(id)
                .or_default()
                .import(group.populations);
        }
        Ok(imported)
    }

    /// Drain the accumulated errors of every dataset.
    pub fn take_errors(&mut self) -> Vec<(DatasetId, String)> {
        self.cache
            .iter_mut()
            .flat_map(|dataset| {
                let id = dataset.id().to_path_buf();
                dataset
                    .take_errors()
                    .into_iter()
                    .map(move |e| (id.clone(), e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::segmentation::LabelImage;
    use crate::state::test_sources::{FakeChannelSource, FakeMaskSource};

    /// Datasets `a`, `b`, `c` with masks `a/mask`, `b/mask`, `c/mask`:
    /// ```text
    /// 1 1 2
    /// 3 3 3
    /// ```
    fn project(max_resident: usize) -> Project {
        let preferences = Preferences {
            max_resident_datasets: max_resident,
            worker_threads: 2,
            ..Preferences::default()
        };
        let mut masks = FakeMaskSource::default();
        for id in ["a", "b", "c"] {
            let mask = LabelImage::new(3, 2, vec![1, 1, 2, 3, 3, 3]).unwrap();
            masks = masks.with_mask(format!("{}/mask", id), mask);
        }
        let mut project = Project::with_sources(
            &preferences,
            Arc::new(FakeChannelSource::with_datasets(&["a", "b", "c"])),
            Arc::new(masks),
        )
        .unwrap();
        for id in ["a", "b", "c"] {
            project
                .set_segmentation_file(Path::new(id), Some(PathBuf::from(format!("{}/mask", id))))
                .unwrap();
        }
        project
    }

    fn open(project: &mut Project, id: &str) {
        project.activate(Path::new(id)).unwrap();
        assert!(project.wait_until_loaded(Path::new(id)).unwrap());
    }

    #[test]
    fn test_query_before_load_is_not_ready() {
        let mut project = project(2);
        assert_eq!(
            project.value_for(Path::new("a"), "CD3", StatisticKind::Mean, 1),
            Err(StatisticsError::NotReady(CacheError::NotLoaded))
        );
        assert_eq!(
            project.value_for(Path::new("zzz"), "CD3", StatisticKind::Mean, 1),
            Err(StatisticsError::NotReady(CacheError::UnknownDataset(PathBuf::from("zzz"))))
        );
    }

    #[test]
    fn test_values_after_load() {
        let mut project = project(2);
        open(&mut project, "a");
        let a = Path::new("a");

        assert_eq!(project.value_for(a, "CD3", StatisticKind::Mean, 1), Ok(Some(1.5)));
        assert_eq!(project.value_for(a, "CD3", StatisticKind::Median, 3), Ok(Some(5.0)));
        assert_eq!(
            project.values_for(a, "CD8", StatisticKind::Mean, &[3, 2, 99]),
            Ok(vec![Some(50.0), Some(30.0), None])
        );
        assert_eq!(
            project.value_for(a, "CD45", StatisticKind::Mean, 1),
            Err(StatisticsError::NotReady(CacheError::UnknownChannel("CD45".to_string())))
        );
    }

    #[test]
    fn test_continuation_fires_on_load() {
        let mut project = project(2);
        let fired = Rc::new(Cell::new(0));

        project.activate(Path::new("a")).unwrap();
        let counter = Rc::clone(&fired);
        project.when(
            |p| p.is_loaded(Path::new("a")),
            move |p| {
                counter.set(counter.get() + 1);
                let value = p.value_for(Path::new("a"), "CD3", StatisticKind::Mean, 2);
                assert_eq!(value, Ok(Some(3.0)));
            },
        );

        project.wait_until_loaded(Path::new("a")).unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(project.pending_reactions(), 0);

        // Condition already true: runs immediately, once
        let counter = Rc::clone(&fired);
        project.when(|p| p.is_loaded(Path::new("a")), move |_| counter.set(counter.get() + 1));
        project.pump();
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_population_from_range() {
        let mut project = project(2);
        open(&mut project, "a");
        let a = Path::new("a");

        let id = project
            .add_population_from_range(a, "CD3", 1.5, 3.0, true, Some("Low".to_string()))
            .unwrap()
            .unwrap();
        let population = project.populations(a).unwrap().get(&id).unwrap();
        assert_eq!(population.name, "Low");
        assert_eq!(population.segments.iter().copied().collect::<Vec<_>>(), vec![1, 2]);

        let none = project
            .add_population_from_range(a, "CD3", 100.0, 200.0, true, None)
            .unwrap();
        assert!(none.is_none());
        assert_eq!(project.populations(a).unwrap().len(), 1);
    }

    #[test]
    fn test_eviction_keeps_populations() {
        let mut project = project(1);
        let a = Path::new("a");
        open(&mut project, "a");
        project
            .add_population_from_segments(a, [1, 3], Some("Kept".to_string()), None)
            .unwrap();
        assert_eq!(project.value_for(a, "CD3", StatisticKind::Mean, 3), Ok(Some(5.0)));

        open(&mut project, "b");
        assert!(!project.is_loaded(a));
        assert_eq!(project.cache().loaded_count(), 1);
        assert_eq!(project.populations(a).unwrap().len(), 1);

        open(&mut project, "a");
        assert_eq!(project.populations(a).unwrap().as_slice()[0].name, "Kept");
        assert_eq!(project.value_for(a, "CD3", StatisticKind::Mean, 3), Ok(Some(5.0)));
    }

    #[test]
    fn test_query_on_unloaded_dataset_keeps_resident_ones() {
        let mut project = project(2);
        open(&mut project, "c");
        open(&mut project, "a");

        assert_eq!(
            project.value_for(Path::new("b"), "CD3", StatisticKind::Mean, 1),
            Err(StatisticsError::NotReady(CacheError::NotLoaded))
        );
        assert!(project.is_loaded(Path::new("c")));
        assert!(project.is_loaded(Path::new("a")));
        assert_eq!(project.cache().recency(), &[PathBuf::from("c"), PathBuf::from("a")]);
    }

    fn drain_statistics(project: &mut Project) {
        for _ in 0..1000 {
            project.pump();
            if project.dispatcher().pending_count() == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(project.dispatcher().pending_count(), 0);
    }

    #[test]
    fn test_statistics_result_dropped_after_clear() {
        let mut project = project(2);
        open(&mut project, "a");
        let a = Path::new("a");

        let ticket = project.request_statistics(a, "CD3", StatisticKind::Mean).unwrap();
        assert!(ticket.is_some());
        project.clear_segmentation(a).unwrap();

        drain_statistics(&mut project);
        let statistics = &project.dataset(a).unwrap().statistics;
        assert_eq!(statistics.computed_count(), 0);
        assert_eq!(statistics.pending_count(), 0);
    }

    #[test]
    fn test_statistics_result_dropped_after_eviction() {
        let mut project = project(1);
        open(&mut project, "a");
        let a = Path::new("a");

        project.request_statistics(a, "CD8", StatisticKind::Median).unwrap();
        open(&mut project, "b");
        assert!(!project.is_loaded(a));

        drain_statistics(&mut project);
        assert!(!project.dataset(a).unwrap().statistics.is_computed("CD8", StatisticKind::Median));
        assert_eq!(
            project.value_for(a, "CD8", StatisticKind::Median, 1),
            Err(StatisticsError::NotReady(CacheError::NotLoaded))
        );
    }

    #[test]
    fn test_navigation_wraps() {
        let mut project = project(3);
        open(&mut project, "c");

        assert_eq!(project.next_dataset().unwrap(), Some(PathBuf::from("a")));
        assert_eq!(project.previous_dataset().unwrap(), Some(PathBuf::from("c")));
        assert_eq!(project.previous_dataset().unwrap(), Some(PathBuf::from("b")));
    }

    #[test]
    fn test_remove_active_falls_back_to_last_active() {
        let mut project = project(3);
        open(&mut project, "a");
        open(&mut project, "c");
        project.add_population_from_segments(Path::new("c"), [1], None, None).unwrap();

        assert_eq!(project.remove_active_dataset().unwrap(), Some(PathBuf::from("c")));
        assert!(project.dataset(Path::new("c")).is_none());
        assert!(project.populations(Path::new("c")).is_none());
        project.wait_until_loaded(Path::new("a")).unwrap();
        assert_eq!(project.active(), Some(Path::new("a")));
    }

    #[test]
    fn test_clear_segmentation() {
        let mut project = project(2);
        open(&mut project, "a");
        let a = Path::new("a");
        project.value_for(a, "CD3", StatisticKind::Mean, 1).unwrap();

        project.clear_segmentation(a).unwrap();
        assert_eq!(
            project.value_for(a, "CD3", StatisticKind::Mean, 1),
            Err(StatisticsError::NotReady(CacheError::NoSegmentation))
        );
        assert_eq!(project.dataset(a).unwrap().statistics.computed_count(), 0);
    }

    #[test]
    fn test_intensity_table() {
        let mut project = project(2);
        open(&mut project, "a");
        let a = Path::new("a");
        project
            .add_population_from_segments(a, [2], Some("Single".to_string()), None)
            .unwrap();

        let table = project.intensity_table(a, None, StatisticKind::Mean).unwrap();
        assert_eq!(table.channels, vec!["CD3", "CD8"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].values, vec![Some(3.0), Some(30.0)]);
        assert_eq!(table.rows[1].populations, vec!["Single"]);
    }

    #[test]
    fn test_project_population_roundtrip() {
        let mut project = project(3);
        open(&mut project, "a");
        open(&mut project, "b");
        project
            .add_population_from_segments(Path::new("a"), [1, 2], Some("A1".to_string()), None)
            .unwrap();
        project
            .add_population_from_segments(Path::new("b"), [3], Some("B1".to_string()), None)
            .unwrap();

        let path = std::env::temp_dir().join(format!("cytoset-project-{}.csv", std::process::id()));
        let result = project
            .export_project_populations("project-csv", &path, &ExportOptions::default())
            .unwrap();
        assert_eq!(result.populations_exported, 2);

        let mut imported = self::project(3);
        assert_eq!(imported.import_project_populations("project-csv", &path).unwrap(), 2);
        assert_eq!(imported.populations(Path::new("b")).unwrap().as_slice()[0].name, "B1");
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            project.export_project_populations("json", &path, &ExportOptions::default()),
            Err(ProjectError::Format(_))
        ));
    }

    #[test]
    fn test_open_project_lists_directories() {
        let root = std::env::temp_dir().join(format!("cytoset-open-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("s2")).unwrap();
        std::fs::create_dir_all(root.join("s1")).unwrap();
        std::fs::write(root.join("notes.txt"), "x").unwrap();

        let mut project = Project::with_sources(
            &Preferences::default(),
            Arc::new(FakeChannelSource::default()),
            Arc::new(FakeMaskSource::default()),
        )
        .unwrap();
        assert_eq!(project.open_project(&root).unwrap(), 2);
        assert_eq!(project.dataset_ids(), &[root.join("s1"), root.join("s2")]);

        let s1 = root.join("s1");
        assert!(project.wait_until_loaded(&s1).unwrap());
        let errors = project.take_errors();
        assert!(errors.contains(&(s1.clone(), "No channels found in s1".to_string())));

        let _ = std::fs::remove_dir_all(&root);
    }
}
