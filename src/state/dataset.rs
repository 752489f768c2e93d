//! One dataset (image set) record and its load lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::ImageChannels;
use crate::segmentation::SegmentIndex;
use crate::statistics::SegmentationStatisticsStore;

/// Dataset identifier: the dataset's directory.
pub type DatasetId = PathBuf;

/// Residency of a dataset's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Only the identifier is known
    Unloaded,
    /// A decode job is in flight
    Loading,
    /// Channels (and segmentation, if any) are resident
    Loaded,
}

/// Everything the decoder produced for one dataset.
#[derive(Debug, Default)]
pub struct DecodedDataset {
    pub channels: ImageChannels,
    pub segmentation: Option<SegmentIndex>,
    /// Human-readable decode problems (failed channels, unreadable mask)
    pub errors: Vec<String>,
}

/// A dataset record owned by the `DatasetCache`.
#[derive(Debug)]
pub struct Dataset {
    id: DatasetId,
    state: LoadState,
    /// Bumped on every load and unload; decode results for an older
    /// generation are stale
    generation: u64,
    channels: Option<Arc<ImageChannels>>,
    segmentation: Option<Arc<SegmentIndex>>,
    /// Explicit mask file, overrides the project-wide segmentation basename
    segmentation_file: Option<PathBuf>,
    pub statistics: SegmentationStatisticsStore,
    errors: Vec<String>,
    last_access: u64,
}

impl Dataset {
    pub fn new(id: DatasetId) -> Self {
        Self {
            id,
            state: LoadState::Unloaded,
            generation: 0,
            channels: None,
            segmentation: None,
            segmentation_file: None,
            statistics: SegmentationStatisticsStore::new(),
            errors: Vec::new(),
            last_access: 0,
        }
    }

    pub fn id(&self) -> &Path {
        &self.id
    }

    /// Display name: the directory name.
    pub fn name(&self) -> String {
        dataset_name(&self.id)
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn channels(&self) -> Option<&Arc<ImageChannels>> {
        self.channels.as_ref()
    }

    pub fn segmentation(&self) -> Option<&Arc<SegmentIndex>> {
        self.segmentation.as_ref()
    }

    pub fn segmentation_file(&self) -> Option<&Path> {
        self.segmentation_file.as_deref()
    }

    pub fn set_segmentation_file(&mut self, path: Option<PathBuf>) {
        self.segmentation_file = path;
    }

    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    pub(crate) fn touch(&mut self, sequence: u64) {
        self.last_access = sequence;
    }

    /// Enter `Loading`, returning the generation the decode job must report.
    pub(crate) fn begin_loading(&mut self) -> u64 {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.generation
    }

    /// Install decoded buffers. Returns `false` (and changes nothing) when
    /// `generation` is stale.
    pub(crate) fn finish_loading(&mut self, decoded: DecodedDataset, generation: u64) -> bool {
        if self.state != LoadState::Loading || generation != self.generation {
            return false;
        }

        let channels = Arc::new(decoded.channels);
        let segmentation = decoded.segmentation.map(Arc::new);

        self.statistics.detach();
        if let Some(segments) = &segmentation {
            self.statistics.attach(Arc::clone(&channels), Arc::clone(segments));
        }

        self.channels = Some(channels);
        self.segmentation = segmentation;
        self.errors.extend(decoded.errors);
        self.state = LoadState::Loaded;
        true
    }

    /// Release every buffer and cached statistic, keeping the identifier.
    pub(crate) fn unload(&mut self) {
        self.generation += 1;
        self.channels = None;
        self.segmentation = None;
        self.statistics.detach();
        self.state = LoadState::Unloaded;
    }

    /// Drop the segment index and every statistic computed from it.
    pub fn clear_segmentation(&mut self) {
        self.segmentation = None;
        self.statistics.detach();
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Drain accumulated errors, including failed statistics jobs.
    pub fn take_errors(&mut self) -> Vec<String> {
        let mut errors = std::mem::take(&mut self.errors);
        errors.extend(self.statistics.take_errors().iter().map(|e| e.to_string()));
        errors
    }
}

/// Directory name of a dataset path, or the full path when it has none.
pub fn dataset_name(id: &Path) -> String {
    id.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string_lossy().into_owned())
}
