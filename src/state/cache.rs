//! Bounded LRU cache of resident datasets.
//!
//! Every dataset of the project has a record here, but at most
//! `max_resident` of them hold decoded buffers at once. Accessing a dataset
//! moves it to the most-recent end of the recency list; when the list grows
//! past capacity the least recently used dataset is unloaded. The active
//! dataset and the one being activated are never evicted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::CacheError;
use super::dataset::{Dataset, DatasetId, LoadState, dataset_name};
use super::decoder::{DatasetDecoder, DecodeCompletion, DecodeJob};
use super::worker_pool::{PoolError, Ticket};
use crate::data::{ChannelSource, MaskSource};

pub struct DatasetCache {
    max_resident: usize,
    datasets: HashMap<DatasetId, Dataset>,
    /// Project order of dataset ids
    order: Vec<DatasetId>,
    /// Resident (loading or loaded) ids, most recently used last
    recency: Vec<DatasetId>,
    active: Option<DatasetId>,
    /// Dataset requested by `activate` that is still loading
    activating: Option<DatasetId>,
    access_sequence: u64,
    /// Decode ticket of every dataset currently loading
    loading: HashMap<DatasetId, Ticket>,
    decoder: DatasetDecoder,
    channel_source: Arc<dyn ChannelSource>,
    mask_source: Arc<dyn MaskSource>,
    /// Mask file name looked up inside every dataset directory
    segmentation_basename: Option<String>,
}

impl DatasetCache {
    pub fn new(
        max_resident: usize,
        decoder_threads: usize,
        channel_source: Arc<dyn ChannelSource>,
        mask_source: Arc<dyn MaskSource>,
    ) -> Result<Self, PoolError> {
        Ok(Self {
            max_resident: max_resident.max(1),
            datasets: HashMap::new(),
            order: Vec::new(),
            recency: Vec::new(),
            active: None,
            activating: None,
            access_sequence: 0,
            loading: HashMap::new(),
            decoder: DatasetDecoder::new(decoder_threads)?,
            channel_source,
            mask_source,
            segmentation_basename: None,
        })
    }

    pub fn max_resident(&self) -> usize {
        self.max_resident
    }

    /// Dataset ids in project order.
    pub fn ids(&self) -> &[DatasetId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &Path) -> Option<&Dataset> {
        self.datasets.get(id)
    }

    pub fn get_mut(&mut self, id: &Path) -> Option<&mut Dataset> {
        self.datasets.get_mut(id)
    }

    /// Records in project order.
    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.order.iter().filter_map(|id| self.datasets.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Dataset> {
        self.datasets.values_mut()
    }

    pub fn active(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    pub fn activating(&self) -> Option<&Path> {
        self.activating.as_deref()
    }

    pub fn active_dataset(&self) -> Option<&Dataset> {
        self.active.as_ref().and_then(|id| self.datasets.get(id))
    }

    /// Resident ids, least recently used first.
    pub fn recency(&self) -> &[DatasetId] {
        &self.recency
    }

    /// Number of datasets holding decoded buffers.
    pub fn loaded_count(&self) -> usize {
        self.datasets.values().filter(|d| d.is_loaded()).count()
    }

    pub fn segmentation_basename(&self) -> Option<&str> {
        self.segmentation_basename.as_deref()
    }

    /// Register a dataset (identifier only). Returns `false` if already known.
    pub fn insert(&mut self, id: DatasetId) -> bool {
        if self.datasets.contains_key(&id) {
            return false;
        }
        log::debug!("Registered dataset {:?}", id);
        self.order.push(id.clone());
        self.datasets.insert(id.clone(), Dataset::new(id));
        true
    }

    /// Forget a dataset entirely.
    pub fn remove(&mut self, id: &Path) -> Option<Dataset> {
        let mut dataset = self.datasets.remove(id)?;
        dataset.unload();
        self.order.retain(|d| d != id);
        self.recency.retain(|d| d != id);
        self.loading.remove(id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        if self.activating.as_deref() == Some(id) {
            self.activating = None;
        }
        log::info!("Removed dataset {:?}", id);
        Some(dataset)
    }

    /// Forget every dataset.
    pub fn clear(&mut self) {
        let ids: Vec<DatasetId> = self.order.clone();
        for id in ids {
            self.remove(&id);
        }
    }

    /// Make `id` the active dataset, loading it in the background if needed.
    ///
    /// Unknown ids are registered first. Returns immediately; the dataset
    /// becomes active once it is `Loaded` (see `poll`).
    pub fn activate(&mut self, id: &Path) -> Result<(), PoolError> {
        self.insert(id.to_path_buf());
        log::info!("Activating dataset {:?}", id);

        let state = self.datasets.get(id).map(Dataset::state);
        match state {
            Some(LoadState::Loaded) => {
                self.active = Some(id.to_path_buf());
                self.activating = None;
            }
            _ => {
                self.activating = Some(id.to_path_buf());
                if state == Some(LoadState::Unloaded) {
                    self.begin_load(id)?;
                }
            }
        }

        self.accessed(id);
        Ok(())
    }

    fn mask_path(&self, dataset: &Dataset) -> Option<PathBuf> {
        if let Some(file) = dataset.segmentation_file() {
            return Some(file.to_path_buf());
        }
        let basename = self.segmentation_basename.as_ref()?;
        let path = dataset.id().join(basename);
        if path.is_file() {
            Some(path)
        } else {
            log::debug!("No segmentation file {:?} in {:?}", basename, dataset.id());
            None
        }
    }

    fn begin_load(&mut self, id: &Path) -> Result<(), PoolError> {
        let Some(dataset) = self.datasets.get(id) else {
            return Ok(());
        };
        let job = DecodeJob {
            dataset: id.to_path_buf(),
            mask_path: self.mask_path(dataset),
            channel_source: Arc::clone(&self.channel_source),
            mask_source: Arc::clone(&self.mask_source),
        };

        let Some(dataset) = self.datasets.get_mut(id) else {
            return Ok(());
        };
        let generation = dataset.begin_loading();
        match self.decoder.request(job, generation) {
            Ok(ticket) => {
                self.loading.insert(id.to_path_buf(), ticket);
                log::info!("Loading dataset {:?}", id);
                Ok(())
            }
            Err(e) => {
                dataset.unload();
                Err(e)
            }
        }
    }

    /// Record an access: move `id` to the most-recent end and evict beyond capacity.
    ///
    /// Unloaded datasets are not resident, so accessing one changes nothing.
    pub fn accessed(&mut self, id: &Path) {
        let Some(dataset) = self
            .datasets
            .get_mut(id)
            .filter(|d| d.state() != LoadState::Unloaded)
        else {
            return;
        };
        self.access_sequence += 1;
        dataset.touch(self.access_sequence);

        self.recency.retain(|d| d != id);
        self.recency.push(id.to_path_buf());
        self.enforce_capacity();
    }

    fn is_protected(&self, id: &Path) -> bool {
        self.active.as_deref() == Some(id) || self.activating.as_deref() == Some(id)
    }

    /// Unload least recently used datasets until within capacity.
    fn enforce_capacity(&mut self) {
        while self.recency.len() > self.max_resident {
            let Some(pos) = self.recency.iter().position(|id| !self.is_protected(id)) else {
                log::debug!("Over capacity but every resident dataset is in use");
                break;
            };
            let id = self.recency.remove(pos);
            self.evict(&id);
        }
    }

    fn evict(&mut self, id: &Path) {
        if let Some(dataset) = self.datasets.get_mut(id) {
            log::info!("Evicting dataset {:?}", id);
            dataset.unload();
        }
        self.loading.remove(id);
    }

    /// Unload a dataset explicitly (it stays in the project).
    pub fn unload(&mut self, id: &Path) {
        self.recency.retain(|d| d != id);
        self.evict(id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
    }

    /// Install finished decodes. Returns the ids that became `Loaded`.
    pub fn poll(&mut self) -> Vec<DatasetId> {
        let mut loaded = Vec::new();
        while let Some(completion) = self.decoder.try_take() {
            if let Some(id) = self.install(completion) {
                loaded.push(id);
            }
        }
        loaded
    }

    /// Block until `id` has finished loading. Returns `Ok(true)` once it is
    /// `Loaded`.
    pub fn wait_until_loaded(&mut self, id: &Path) -> Result<bool, CacheError> {
        let state = self
            .datasets
            .get(id)
            .map(Dataset::state)
            .ok_or_else(|| CacheError::UnknownDataset(id.to_path_buf()))?;
        if state == LoadState::Loaded {
            return Ok(true);
        }
        let Some(&ticket) = self.loading.get(id) else {
            return Ok(false);
        };
        if let Some(completion) = self.decoder.wait_for(ticket) {
            self.install(completion);
        }
        Ok(self.datasets.get(id).is_some_and(Dataset::is_loaded))
    }

    fn install(&mut self, completion: DecodeCompletion) -> Option<DatasetId> {
        let id = completion.dataset;
        let Some(dataset) = self.datasets.get_mut(&id) else {
            log::debug!("Discarding decode result for removed dataset {:?}", id);
            return None;
        };

        if !dataset.finish_loading(completion.decoded, completion.generation) {
            log::debug!("Discarding stale decode result for {:?}", id);
            return None;
        }
        self.loading.remove(&id);

        let channel_count = dataset.channels().map_or(0, |c| c.len());
        if channel_count == 0 {
            let warning = format!("No channels found in {}", dataset_name(&id));
            log::warn!("{}", warning);
            dataset.push_error(warning);
        }
        log::info!(
            "Loaded dataset {:?}: {} channels, {} segments",
            id,
            channel_count,
            dataset.segmentation().map_or(0, |s| s.len())
        );

        if self.activating.as_deref() == Some(id.as_path()) {
            self.active = Some(id.clone());
            self.activating = None;
        }
        self.enforce_capacity();
        Some(id)
    }

    /// Use `basename` as the mask file of every dataset and reload resident ones.
    pub fn set_segmentation_basename(&mut self, basename: Option<String>) -> Result<(), PoolError> {
        if self.segmentation_basename == basename {
            return Ok(());
        }
        self.segmentation_basename = basename;
        self.reload_resident()
    }

    /// Use an explicit mask file for one dataset, reloading it if resident.
    pub fn set_segmentation_file(&mut self, id: &Path, path: Option<PathBuf>) -> Result<(), PoolError> {
        self.insert(id.to_path_buf());
        if let Some(dataset) = self.datasets.get_mut(id) {
            dataset.set_segmentation_file(path);
            if dataset.state() != LoadState::Unloaded {
                self.begin_load(id)?;
            }
        }
        Ok(())
    }

    fn reload_resident(&mut self) -> Result<(), PoolError> {
        let resident: Vec<DatasetId> = self.recency.clone();
        for id in resident {
            self.begin_load(&id)?;
        }
        Ok(())
    }
}
