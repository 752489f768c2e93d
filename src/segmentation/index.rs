//! Per-segment pixel index built from a label image.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::label_image::LabelImage;
use super::outline::{PixelLocation, trace_outline};
use crate::constants::BACKGROUND_LABEL;
use crate::data::DecodeError;

/// Segment identifier, the label value in the mask.
pub type SegmentId = u32;

/// Mean pixel coordinate of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

/// One labeled region of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Label value, unique within the dataset
    pub id: SegmentId,
    /// Flat pixel indices (`y * width + x`) in ascending order
    pub pixels: Vec<usize>,
    /// Mean of member pixel coordinates, `None` for a segment without pixels
    pub centroid: Option<Centroid>,
    /// Closed boundary polygon, first point not repeated
    pub outline: Vec<PixelLocation>,
}

impl Segment {
    fn new(id: SegmentId, pixels: Vec<usize>, width: u32) -> Self {
        let centroid = centroid(&pixels, width);
        let outline = trace_outline(&pixels, width);
        Self {
            id,
            pixels,
            centroid,
            outline,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }
}

fn centroid(pixels: &[usize], width: u32) -> Option<Centroid> {
    if pixels.is_empty() || width == 0 {
        return None;
    }
    let width = width as usize;
    let (mut sum_x, mut sum_y) = (0u64, 0u64);
    for &pixel in pixels {
        sum_x += (pixel % width) as u64;
        sum_y += (pixel / width) as u64;
    }
    let count = pixels.len() as f64;
    Some(Centroid {
        x: sum_x as f64 / count,
        y: sum_y as f64 / count,
    })
}

/// Segment geometry of one dataset.
///
/// Immutable once built; shared with statistics workers behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    width: u32,
    height: u32,
    segments: BTreeMap<SegmentId, Segment>,
    /// Flat pixel index -> owning segment ids (several when segments overlap)
    pixel_map: HashMap<usize, Vec<SegmentId>>,
}

impl SegmentIndex {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.contains_key(&id)
    }

    /// Segment ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments.keys().copied()
    }

    /// Segments in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Segments owning the pixel with the given flat index.
    pub fn segments_at(&self, pixel: usize) -> &[SegmentId] {
        self.pixel_map.get(&pixel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Segments owning the pixel at `(x, y)`.
    pub fn segments_at_point(&self, x: u32, y: u32) -> &[SegmentId] {
        if x >= self.width || y >= self.height {
            return &[];
        }
        self.segments_at(y as usize * self.width as usize + x as usize)
    }
}

/// Decodes label images into a `SegmentIndex`.
pub struct SegmentIndexBuilder;

impl SegmentIndexBuilder {
    /// Build the index from a decoded label image.
    pub fn from_label_image(image: &LabelImage) -> SegmentIndex {
        let mut groups: BTreeMap<SegmentId, Vec<usize>> = BTreeMap::new();
        for (index, label) in image.labeled_pixels() {
            groups.entry(label).or_default().push(index);
        }
        Self::assemble(image.width(), image.height(), groups)
    }

    /// Build the index from raw row-major labels.
    pub fn from_labels(width: u32, height: u32, labels: Vec<u32>) -> Result<SegmentIndex, DecodeError> {
        let image = LabelImage::new(width, height, labels)?;
        Ok(Self::from_label_image(&image))
    }

    /// Build the index from pre-parsed pixel lists, which may overlap.
    ///
    /// Lists sharing an id are merged. Nothing is built if any list is invalid.
    pub fn from_pixel_lists(
        width: u32,
        height: u32,
        lists: impl IntoIterator<Item = (SegmentId, Vec<usize>)>,
    ) -> Result<SegmentIndex, DecodeError> {
        let pixel_count = width as usize * height as usize;
        let mut groups: BTreeMap<SegmentId, Vec<usize>> = BTreeMap::new();

        for (id, pixels) in lists {
            if id == BACKGROUND_LABEL {
                return Err(DecodeError::BackgroundSegment(id));
            }
            if let Some(&pixel) = pixels.iter().find(|&&p| p >= pixel_count) {
                return Err(DecodeError::PixelOutOfBounds {
                    segment: id,
                    pixel,
                    width,
                    height,
                });
            }
            groups.entry(id).or_default().extend(pixels);
        }

        for pixels in groups.values_mut() {
            pixels.sort_unstable();
            pixels.dedup();
        }

        Ok(Self::assemble(width, height, groups))
    }

    fn assemble(width: u32, height: u32, groups: BTreeMap<SegmentId, Vec<usize>>) -> SegmentIndex {
        let mut pixel_map: HashMap<usize, Vec<SegmentId>> = HashMap::new();
        for (&id, pixels) in &groups {
            for &pixel in pixels {
                pixel_map.entry(pixel).or_default().push(id);
            }
        }

        let segments: BTreeMap<SegmentId, Segment> = groups
            .into_iter()
            .map(|(id, pixels)| (id, Segment::new(id, pixels, width)))
            .collect();

        log::debug!(
            "Built segment index: {} segments over {}x{} pixels",
            segments.len(),
            width,
            height
        );

        SegmentIndex {
            width,
            height,
            segments,
            pixel_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_pixels_by_label() {
        #[rustfmt::skip]
        let labels = vec![
            0, 1, 1,
            0, 1, 0,
            5, 5, 0,
        ];
        let index = SegmentIndexBuilder::from_labels(3, 3, labels).unwrap();
        assert_eq!(index.ids().collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(index.get(1).unwrap().pixels, vec![1, 2, 4]);
        assert_eq!(index.get(5).unwrap().pixels, vec![6, 7]);
        assert_eq!(index.segments_at(4), &[1]);
        assert!(index.segments_at(0).is_empty());
        assert_eq!(index.segments_at_point(1, 2), &[5]);
    }

    #[test]
    fn test_centroid_is_mean_coordinate() {
        let labels = vec![3, 3, 0, 3, 3, 0];
        let index = SegmentIndexBuilder::from_labels(3, 2, labels).unwrap();
        let centroid = index.get(3).unwrap().centroid.unwrap();
        assert_eq!(centroid, Centroid { x: 0.5, y: 0.5 });
    }

    #[test]
    fn test_non_contiguous_ids() {
        let labels = vec![100, 0, 7, 0];
        let index = SegmentIndexBuilder::from_labels(2, 2, labels).unwrap();
        assert_eq!(index.ids().collect::<Vec<_>>(), vec![7, 100]);
        assert_eq!(index.get(7).unwrap().outline, vec![PixelLocation::new(0, 1)]);
    }

    #[test]
    fn test_all_background_is_empty() {
        let index = SegmentIndexBuilder::from_labels(4, 4, vec![0; 16]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.width(), 4);
    }

    #[test]
    fn test_wrong_length_fails() {
        let result = SegmentIndexBuilder::from_labels(4, 4, vec![0; 15]);
        assert!(matches!(result, Err(DecodeError::BufferLength { found: 15, .. })));
    }

    #[test]
    fn test_overlapping_pixel_lists() {
        let index =
            SegmentIndexBuilder::from_pixel_lists(3, 1, vec![(1, vec![0, 1]), (2, vec![1, 2])])
                .unwrap();
        assert_eq!(index.segments_at(1), &[1, 2]);
        assert_eq!(index.get(2).unwrap().outline.len(), 2);
    }

    #[test]
    fn test_pixel_lists_merge_duplicates() {
        let index =
            SegmentIndexBuilder::from_pixel_lists(3, 1, vec![(4, vec![2, 0]), (4, vec![0])])
                .unwrap();
        assert_eq!(index.get(4).unwrap().pixels, vec![0, 2]);
    }

    #[test]
    fn test_pixel_lists_reject_invalid_input() {
        let out_of_bounds = SegmentIndexBuilder::from_pixel_lists(2, 2, vec![(1, vec![0, 4])]);
        assert!(matches!(
            out_of_bounds,
            Err(DecodeError::PixelOutOfBounds { segment: 1, pixel: 4, .. })
        ));

        let background = SegmentIndexBuilder::from_pixel_lists(2, 2, vec![(0, vec![0])]);
        assert!(matches!(background, Err(DecodeError::BackgroundSegment(0))));
    }
}
