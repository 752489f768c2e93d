//! Color utility functions shared across the application.
//!
//! Populations are drawn with a fixed RGB color. When the user does not pick
//! one, a random hue is chosen at constant saturation and brightness so that
//! generated colors stay readable on both dark and light backgrounds.

use serde::{Deserialize, Deserializer};

use crate::constants::{POPULATION_COLOR_SATURATION, POPULATION_COLOR_VALUE};

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// Convert a 0.0-1.0 RGB triple into 8-bit components.
pub fn rgb_to_u8(rgb: (f32, f32, f32)) -> [u8; 3] {
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_u8(rgb.0), to_u8(rgb.1), to_u8(rgb.2)]
}

/// Pick a random population color.
pub fn random_color() -> [u8; 3] {
    let hue = rand::random::<f32>() * 360.0;
    rgb_to_u8(hsv_to_rgb(
        hue,
        POPULATION_COLOR_SATURATION,
        POPULATION_COLOR_VALUE,
    ))
}

/// Format a color as `#rrggbb`.
pub fn to_hex(color: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Split a packed `0xRRGGBB` value into components. Bits above 24 are ignored.
pub fn from_packed(packed: u32) -> [u8; 3] {
    [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
}

/// Pack a color as `0xRRGGBB`.
pub fn to_packed(color: [u8; 3]) -> u32 {
    (u32::from(color[0]) << 16) | (u32::from(color[1]) << 8) | u32::from(color[2])
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Rgb([u8; 3]),
    Packed(u32),
}

/// Read a color written either as `[r, g, b]` or as a packed `0xRRGGBB` number.
pub fn deserialize_color<'de, D>(deserializer: D) -> Result<[u8; 3], D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ColorRepr::deserialize(deserializer)? {
        ColorRepr::Rgb(rgb) => rgb,
        ColorRepr::Packed(packed) => from_packed(packed),
    })
}
