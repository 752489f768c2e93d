//! Boundary tracing for a single segment.
//!
//! Uses inner-boundary tracing with 8-connectivity: starting at the
//! top-left-most pixel, walk the neighbourhood anticlockwise until the first
//! two boundary pixels repeat. Only the connected component containing the
//! start pixel is traced.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A pixel location in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelLocation {
    pub x: u32,
    pub y: u32,
}

impl PixelLocation {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Neighbour offsets, anticlockwise starting east (y grows downwards).
const DIRECTIONS: [(isize, isize); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Trace the outline of the pixels with the given flat indices.
///
/// Returns the boundary as a closed polygon without the repeated start
/// point. A single isolated pixel yields a one-point outline, an empty pixel
/// list an empty one.
pub fn trace_outline(pixels: &[usize], width: u32) -> Vec<PixelLocation> {
    let width = width as usize;
    if pixels.is_empty() || width == 0 {
        return Vec::new();
    }

    let coords = || pixels.iter().map(|&p| (p % width, p / width));
    let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
    let (mut max_x, mut max_y) = (0usize, 0usize);
    for (x, y) in coords() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    // One pixel of padding on every side so neighbour lookups never leave the mask
    let mut mask = Array2::<bool>::from_elem((max_y - min_y + 3, max_x - min_x + 3), false);
    for (x, y) in coords() {
        mask[(y - min_y + 1, x - min_x + 1)] = true;
    }

    let Some(&start_index) = pixels.iter().min() else {
        return Vec::new();
    };
    let start = (
        (start_index % width - min_x + 1) as isize,
        (start_index / width - min_y + 1) as isize,
    );

    let local = trace_mask(&mask, start, pixels.len());

    local
        .into_iter()
        .map(|(x, y)| {
            PixelLocation::new(
                (x as usize + min_x - 1) as u32,
                (y as usize + min_y - 1) as u32,
            )
        })
        .collect()
}

fn trace_mask(
    mask: &Array2<bool>,
    start: (isize, isize),
    pixel_count: usize,
) -> Vec<(isize, isize)> {
    let is_set = |(x, y): (isize, isize)| {
        x >= 0 && y >= 0 && mask.get((y as usize, x as usize)).copied().unwrap_or(false)
    };

    // A boundary pixel is visited at most four times (once per incoming side)
    let max_steps = 4 * pixel_count + 4;

    let mut boundary = vec![start];
    let mut current = start;
    let mut dir = 7usize;

    loop {
        let first = if dir % 2 == 0 {
            (dir + 7) % 8
        } else {
            (dir + 6) % 8
        };

        let next = (0..8).map(|i| (first + i) % 8).find_map(|d| {
            let (dx, dy) = DIRECTIONS[d];
            let candidate = (current.0 + dx, current.1 + dy);
            is_set(candidate).then_some((candidate, d))
        });

        let Some((pixel, d)) = next else {
            // Isolated pixel
            break;
        };
        dir = d;

        if boundary.len() >= 2 && current == boundary[0] && pixel == boundary[1] {
            boundary.pop();
            break;
        }

        boundary.push(pixel);
        current = pixel;

        if boundary.len() > max_steps {
            log::warn!(
                "Outline tracing did not close after {} steps, truncating",
                max_steps
            );
            break;
        }
    }

    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations(points: &[(u32, u32)]) -> Vec<PixelLocation> {
        points.iter().map(|&(x, y)| PixelLocation::new(x, y)).collect()
    }

    #[test]
    fn test_empty_and_single_pixel() {
        assert!(trace_outline(&[], 4).is_empty());
        // pixel (2, 1) in a 4-wide image
        assert_eq!(trace_outline(&[6], 4), locations(&[(2, 1)]));
    }

    #[test]
    fn test_square_block() {
        // 2x2 block at (1,1)..(2,2) in a 4x4 image
        let outline = trace_outline(&[5, 6, 9, 10], 4);
        assert_eq!(outline, locations(&[(1, 1), (1, 2), (2, 2), (2, 1)]));
    }

    #[test]
    fn test_horizontal_line() {
        let outline = trace_outline(&[0, 1, 2], 5);
        assert_eq!(outline, locations(&[(0, 0), (1, 0), (2, 0), (1, 0)]));
    }

    #[test]
    fn test_interior_pixels_excluded() {
        // 3x3 block, centre pixel (1,1) must not be on the outline
        let pixels: Vec<usize> = (0..9).collect();
        let outline = trace_outline(&pixels, 3);
        assert_eq!(outline.len(), 8);
        assert!(!outline.contains(&PixelLocation::new(1, 1)));
        assert_eq!(outline[0], PixelLocation::new(0, 0));
    }

    #[test]
    fn test_consecutive_points_adjacent() {
        // L-shape
        let width = 4;
        let pixels = [0, 4, 8, 9, 10];
        let outline = trace_outline(&pixels, width);
        for pair in outline.windows(2) {
            let dx = (pair[0].x as i64 - pair[1].x as i64).abs();
            let dy = (pair[0].y as i64 - pair[1].y as i64).abs();
            assert!(dx <= 1 && dy <= 1, "{:?} not adjacent", pair);
        }
        let last = outline[outline.len() - 1];
        assert!((last.x as i64 - outline[0].x as i64).abs() <= 1);
        assert!((last.y as i64 - outline[0].y as i64).abs() <= 1);
    }
}
