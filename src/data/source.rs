//! Collaborators that turn files on disk into channels and label images.
//!
//! The dataset cache only talks to these traits, so tests and embedders can
//! substitute in-memory sources. The file-backed implementations decode
//! through the `LoaderRegistry`.

use std::path::{Path, PathBuf};

use crate::data::{Channel, ChannelError, DecodeError, ImageChannels, LoaderRegistry};
use crate::segmentation::LabelImage;

/// Result of decoding every channel of a dataset directory.
#[derive(Debug, Default)]
pub struct ChannelLoad {
    /// Successfully decoded channels (may be empty)
    pub channels: ImageChannels,
    /// Channels that failed, one entry per file
    pub errors: Vec<ChannelError>,
}

/// Decodes a dataset directory into named intensity channels.
pub trait ChannelSource: Send + Sync {
    /// Decode every channel found in `dir`.
    ///
    /// `exclude` names a file that must not be treated as a channel (the
    /// segmentation mask when it lives in the same directory). Per-channel
    /// failures are reported in `ChannelLoad::errors`; only an unreadable
    /// directory is an error.
    fn load_channels(
        &self,
        dir: &Path,
        exclude: Option<&Path>,
    ) -> Result<ChannelLoad, DecodeError>;
}

/// Decodes a segmentation mask file into a label image.
pub trait MaskSource: Send + Sync {
    /// Decode the mask at `path`. When `expected` is `Some((width, height))`
    /// the decoded dimensions must match.
    fn load_mask(
        &self,
        path: &Path,
        expected: Option<(u32, u32)>,
    ) -> Result<LabelImage, DecodeError>;
}

/// Channel source reading one channel per image file in a directory.
///
/// The channel name is the file stem (`CD45.tif` -> `CD45`).
pub struct FolderChannelSource {
    registry: LoaderRegistry,
}

impl FolderChannelSource {
    pub fn new() -> Self {
        Self {
            registry: LoaderRegistry::new(),
        }
    }

    /// List channel files in `dir`, sorted by path.
    fn channel_files(&self, dir: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>, DecodeError> {
        let entries = std::fs::read_dir(dir).map_err(|source| DecodeError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| self.registry.is_supported_file(n))
                    .unwrap_or(false)
            })
            .filter(|path| exclude.is_none_or(|excluded| !same_file(path, excluded)))
            .collect();

        files.sort();
        Ok(files)
    }
}

impl Default for FolderChannelSource {
    fn default() -> Self {
        Self::new()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn channel_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

impl ChannelSource for FolderChannelSource {
    fn load_channels(
        &self,
        dir: &Path,
        exclude: Option<&Path>,
    ) -> Result<ChannelLoad, DecodeError> {
        let files = self.channel_files(dir, exclude)?;
        log::debug!("Found {} channel files in {:?}", files.len(), dir);

        let mut load = ChannelLoad::default();
        let mut dimensions: Option<(u32, u32)> = None;

        for path in files {
            let name = channel_name(&path);
            let filename = path.file_name().and_then(|n| n.to_str());

            let raster = std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    self.registry
                        .load(&bytes, filename)
                        .map_err(|e| e.to_string())
                });

            let raster = match raster {
                Ok(raster) => raster,
                Err(message) => {
                    log::warn!("Failed to load channel {}: {}", name, message);
                    load.errors.push(ChannelError {
                        channel: name,
                        message,
                    });
                    continue;
                }
            };

            let dims = (raster.width, raster.height);
            match dimensions {
                None => {
                    dimensions = Some(dims);
                    load.channels = ImageChannels::new(dims.0, dims.1);
                }
                Some(expected) if expected != dims => {
                    let message = format!(
                        "dimensions {}x{} differ from dataset dimensions {}x{}",
                        dims.0, dims.1, expected.0, expected.1
                    );
                    log::warn!("Skipping channel {}: {}", name, message);
                    load.errors.push(ChannelError {
                        channel: name,
                        message,
                    });
                    continue;
                }
                Some(_) => {}
            }

            load.channels
                .insert(Channel::new(name, raster.into_intensities()));
        }

        log::info!(
            "Loaded {} channels from {:?} ({} errors)",
            load.channels.len(),
            dir,
            load.errors.len()
        );
        Ok(load)
    }
}

/// Mask source decoding TIFF/PNG/NumPy label images.
pub struct FileMaskSource {
    registry: LoaderRegistry,
}

impl FileMaskSource {
    pub fn new() -> Self {
        Self {
            registry: LoaderRegistry::new(),
        }
    }
}

impl Default for FileMaskSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskSource for FileMaskSource {
    fn load_mask(
        &self,
        path: &Path,
        expected: Option<(u32, u32)>,
    ) -> Result<LabelImage, DecodeError> {
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let filename = path.file_name().and_then(|n| n.to_str());
        let raster = self
            .registry
            .load(&bytes, filename)
            .map_err(|source| DecodeError::Loader {
                path: path.to_path_buf(),
                source,
            })?;

        let found = (raster.width, raster.height);
        if let Some(expected) = expected.filter(|e| *e != found) {
            return Err(DecodeError::DimensionMismatch {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }

        let labels = raster
            .into_labels()
            .map_err(|message| DecodeError::InvalidLabels {
                path: path.to_path_buf(),
                message,
            })?;

        LabelImage::new(found.0, found.1, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Luma};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cytoset-source-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, width: u32, height: u32, values: Vec<u16>) {
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(width, height, values).unwrap();
        DynamicImage::ImageLuma16(buf).save(path).unwrap();
    }

    #[test]
    fn test_folder_source_loads_channels_and_reports_errors() {
        let dir = scratch_dir("channels");
        write_png(&dir.join("CD3.png"), 2, 2, vec![1, 2, 3, 4]);
        write_png(&dir.join("CD8.png"), 2, 2, vec![5, 6, 7, 8]);
        write_png(&dir.join("Small.png"), 1, 1, vec![9]);
        write_png(&dir.join("mask.png"), 2, 2, vec![0, 1, 1, 0]);
        std::fs::write(dir.join("Broken.tif"), b"not a tiff").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let source = FolderChannelSource::new();
        let load = source
            .load_channels(&dir, Some(&dir.join("mask.png")))
            .unwrap();

        assert_eq!(load.channels.names(), vec!["CD3", "CD8"]);
        assert_eq!((load.channels.width, load.channels.height), (2, 2));
        assert_eq!(&*load.channels.get("CD8").unwrap().data, &[5.0, 6.0, 7.0, 8.0]);

        let failed: Vec<&str> = load.errors.iter().map(|e| e.channel.as_str()).collect();
        assert_eq!(failed, vec!["Broken", "Small"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_folder_source_missing_dir() {
        let source = FolderChannelSource::new();
        let result = source.load_channels(Path::new("/definitely/not/here"), None);
        assert!(matches!(result, Err(DecodeError::Io { .. })));
    }

    #[test]
    fn test_mask_source_checks_dimensions() {
        let dir = scratch_dir("mask");
        let path = dir.join("mask.png");
        write_png(&path, 3, 1, vec![0, 7, 7]);

        let source = FileMaskSource::new();
        let mask = source.load_mask(&path, Some((3, 1))).unwrap();
        assert_eq!(mask.width(), 3);
        assert_eq!(mask.get(1, 0), Some(7));

        let mismatch = source.load_mask(&path, Some((4, 4)));
        assert!(matches!(
            mismatch,
            Err(DecodeError::DimensionMismatch { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
