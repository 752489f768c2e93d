//! Integer label raster produced by a segmentation tool.

use ndarray::Array2;

use crate::constants::BACKGROUND_LABEL;
use crate::data::DecodeError;

/// A label image: one integer label per pixel, `0` is background.
///
/// Stored as a `(height, width)` array so that the flat index of pixel
/// `(x, y)` is `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelImage {
    labels: Array2<u32>,
}

impl LabelImage {
    /// Build a label image from row-major labels.
    pub fn new(width: u32, height: u32, labels: Vec<u32>) -> Result<Self, DecodeError> {
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(DecodeError::BufferLength {
                width,
                height,
                expected,
                found: labels.len(),
            });
        }

        let labels = Array2::from_shape_vec((height as usize, width as usize), labels).map_err(
            |_| DecodeError::BufferLength {
                width,
                height,
                expected,
                found: expected,
            },
        )?;
        Ok(Self { labels })
    }

    /// Wrap an existing `(height, width)` array.
    pub fn from_array(labels: Array2<u32>) -> Self {
        Self { labels }
    }

    pub fn width(&self) -> u32 {
        self.labels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.labels.nrows() as u32
    }

    /// Label at `(x, y)`, `None` when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        self.labels.get((y as usize, x as usize)).copied()
    }

    /// Iterate `(flat_index, label)` over non-background pixels in row-major order.
    pub fn labeled_pixels(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label != BACKGROUND_LABEL)
            .map(|(index, label)| (index, *label))
    }

    pub fn as_array(&self) -> &Array2<u32> {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(LabelImage::new(2, 2, vec![0, 1, 2]).is_err());
        let image = LabelImage::new(3, 2, vec![0, 1, 0, 2, 2, 0]).unwrap();
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 2);
        assert_eq!(image.get(0, 1), Some(2));
        assert_eq!(image.get(3, 0), None);
    }

    #[test]
    fn test_labeled_pixels_skip_background() {
        let image = LabelImage::new(3, 2, vec![0, 1, 0, 2, 2, 0]).unwrap();
        let pixels: Vec<(usize, u32)> = image.labeled_pixels().collect();
        assert_eq!(pixels, vec![(1, 1), (3, 2), (4, 2)]);
    }
}
