//! In-memory channel and mask sources for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::{Channel, ChannelLoad, ChannelSource, DecodeError, ImageChannels, MaskSource};
use crate::segmentation::LabelImage;

/// Serves fixed channels per dataset directory; unknown directories have none.
#[derive(Default)]
pub struct FakeChannelSource {
    datasets: HashMap<PathBuf, ImageChannels>,
    loads: AtomicUsize,
}

impl FakeChannelSource {
    /// Every listed dataset gets a 3x2 image with channels `CD3` and `CD8`.
    ///
    /// `CD3` holds `1..=6` row-major, `CD8` holds `10, 20, ..., 60`.
    pub fn with_datasets(ids: &[&str]) -> Self {
        let mut source = Self::default();
        for id in ids {
            let mut channels = ImageChannels::new(3, 2);
            channels.insert(Channel::new("CD3", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
            channels.insert(Channel::new("CD8", vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]));
            source.datasets.insert(PathBuf::from(id), channels);
        }
        source
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ChannelSource for FakeChannelSource {
    fn load_channels(
        &self,
        dir: &Path,
        _exclude: Option<&Path>,
    ) -> Result<ChannelLoad, DecodeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(ChannelLoad {
            channels: self.datasets.get(dir).cloned().unwrap_or_default(),
            errors: Vec::new(),
        })
    }
}

/// Serves fixed label images by path.
#[derive(Default)]
pub struct FakeMaskSource {
    masks: HashMap<PathBuf, LabelImage>,
}

impl FakeMaskSource {
    pub fn with_mask(mut self, path: impl Into<PathBuf>, mask: LabelImage) -> Self {
        self.masks.insert(path.into(), mask);
        self
    }
}

impl MaskSource for FakeMaskSource {
    fn load_mask(
        &self,
        path: &Path,
        expected: Option<(u32, u32)>,
    ) -> Result<LabelImage, DecodeError> {
        let mask = self.masks.get(path).cloned().ok_or_else(|| DecodeError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such mask"),
        })?;
        let found = (mask.width(), mask.height());
        if let Some(expected) = expected.filter(|e| *e != found) {
            return Err(DecodeError::DimensionMismatch {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }
        Ok(mask)
    }
}
