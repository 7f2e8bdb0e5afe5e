//! HSL color helpers shared by analysis and color queries.

use crate::error::{GalleriaError, Result};
use serde::{Deserialize, Serialize};

/// A color in hue (degrees, `0..360`), saturation and lightness (`0..=1`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Hsl {
    /// Unweighted distance: normalized circular hue + saturation + lightness.
    pub fn distance(&self, other: &Hsl) -> f64 {
        hue_difference(self.hue, other.hue) / 180.0
            + (self.saturation - other.saturation).abs()
            + (self.lightness - other.lightness).abs()
    }
}

/// Circular hue difference in degrees, `0..=180`.
pub fn hue_difference(a: f64, b: f64) -> f64 {
    let direct = (a - b).abs() % 360.0;
    direct.min(360.0 - direct)
}

/// Convert 8-bit RGB to HSL.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let lightness = (max + min) / 2.0;

    if delta == 0.0 {
        return Hsl {
            hue: 0.0,
            saturation: 0.0,
            lightness,
        };
    }

    let hue = if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = delta / (1.0 - (2.0 * lightness - 1.0).abs());

    Hsl {
        hue,
        saturation: saturation.clamp(0.0, 1.0),
        lightness,
    }
}

/// Parse `#rrggbb`, `rrggbb` or `#rgb`.
pub fn parse_hex(color: &str) -> Result<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GalleriaError::InvalidColor(color.to_string()));
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(GalleriaError::InvalidColor(color.to_string())),
    };
    let channel = |i: usize| {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| GalleriaError::InvalidColor(color.to_string()))
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

/// Parse a hex color straight into HSL.
pub fn hex_to_hsl(color: &str) -> Result<Hsl> {
    let (r, g, b) = parse_hex(color)?;
    Ok(rgb_to_hsl(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_primary_colors() {
        let red = rgb_to_hsl(255, 0, 0);
        assert!(approx(red.hue, 0.0) && approx(red.saturation, 1.0) && approx(red.lightness, 0.5));
        let green = rgb_to_hsl(0, 255, 0);
        assert!(approx(green.hue, 120.0));
        let blue = rgb_to_hsl(0, 0, 255);
        assert!(approx(blue.hue, 240.0));
        let magenta = rgb_to_hsl(255, 0, 255);
        assert!(approx(magenta.hue, 300.0));
    }

    #[test]
    fn test_grey_has_no_saturation() {
        let grey = rgb_to_hsl(128, 128, 128);
        assert!(approx(grey.saturation, 0.0));
        assert!(approx(grey.hue, 0.0));
    }

    #[test]
    fn test_hue_wraps_around() {
        assert!(approx(hue_difference(350.0, 10.0), 20.0));
        assert!(approx(hue_difference(10.0, 350.0), 20.0));
        assert!(approx(hue_difference(0.0, 180.0), 180.0));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ff8000").unwrap(), (255, 128, 0));
        assert_eq!(parse_hex("0f0").unwrap(), (0, 255, 0));
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#gg0000").is_err());
        // Six bytes, but not six hex digits
        assert!(parse_hex("#€000").is_err());
        assert!(parse_hex("ab€").is_err());
    }
}
