//! Decoded intensity channels of one dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Observed value range of a channel or of a statistic map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// Range over an iterator of values, skipping NaN.
    ///
    /// Returns `None` when no finite-or-infinite (non-NaN) value is present.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut range: Option<MinMax> = None;
        for value in values.into_iter().filter(|v| !v.is_nan()) {
            range = Some(match range {
                None => MinMax {
                    min: value,
                    max: value,
                },
                Some(r) => MinMax {
                    min: r.min.min(value),
                    max: r.max.max(value),
                },
            });
        }
        range
    }

    /// Whether `value` lies in `[min, max]` inclusive.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A single per-pixel intensity measurement (one marker/stain).
///
/// The intensity buffer is shared read-only with statistics workers, so it is
/// held behind an `Arc` and never mutated after decode.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name, unique within its dataset (file stem of the source image)
    pub name: String,
    /// Row-major intensities, `width * height` values
    pub data: Arc<[f32]>,
    /// Observed range of `data`, `None` for an empty buffer
    pub min_max: Option<MinMax>,
}

impl Channel {
    /// Create a channel, computing its observed range.
    pub fn new(name: impl Into<String>, data: Vec<f32>) -> Self {
        let min_max = MinMax::from_values(data.iter().map(|&v| f64::from(v)));
        Self {
            name: name.into(),
            data: data.into(),
            min_max,
        }
    }

    /// Number of pixels in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A channel that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    /// Name of the channel that failed
    pub channel: String,
    /// Human-readable reason
    pub message: String,
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error loading channel {}: {}", self.channel, self.message)
    }
}

/// All decoded channels of one dataset, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ImageChannels {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    channels: BTreeMap<String, Channel>,
}

impl ImageChannels {
    /// Create an empty channel set with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: BTreeMap::new(),
        }
    }

    /// Number of pixels per channel.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Insert a channel, replacing any channel with the same name.
    pub fn insert(&mut self, channel: Channel) {
        self.channels.insert(channel.name.clone(), channel);
    }

    /// Get a channel by name.
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Channel names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    /// Iterate over channels in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_skips_nan() {
        let range = MinMax::from_values([3.0, f64::NAN, -1.0, 7.5]).unwrap();
        assert_eq!(range.min, -1.0);
        assert_eq!(range.max, 7.5);
    }

    #[test]
    fn test_min_max_empty() {
        assert!(MinMax::from_values(Vec::new()).is_none());
        assert!(MinMax::from_values([f64::NAN]).is_none());
    }

    #[test]
    fn test_min_max_contains_is_inclusive() {
        let range = MinMax { min: 1.0, max: 2.0 };
        assert!(range.contains(1.0));
        assert!(range.contains(2.0));
        assert!(!range.contains(2.0001));
    }

    #[test]
    fn test_channel_range() {
        let channel = Channel::new("CD45", vec![4.0, 1.0, 9.0]);
        assert_eq!(channel.len(), 3);
        assert_eq!(channel.min_max, Some(MinMax { min: 1.0, max: 9.0 }));
    }

    #[test]
    fn test_channels_sorted_names() {
        let mut channels = ImageChannels::new(1, 1);
        channels.insert(Channel::new("dsDNA", vec![1.0]));
        channels.insert(Channel::new("CD3", vec![2.0]));
        assert_eq!(channels.names(), vec!["CD3", "dsDNA"]);
        assert_eq!(channels.pixel_count(), 1);
        assert!(channels.get("CD3").is_some());
        assert!(channels.get("CD8").is_none());
    }
}
