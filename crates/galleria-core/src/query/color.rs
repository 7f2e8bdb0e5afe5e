//! Approximate dominant-color matching.

use crate::config::QueryConfig;
use crate::media::{DominantColor, Hsl};

/// Whether an image's dominant colors are close enough to `target`.
///
/// Each color contributes its distance to the target weighted by its area;
/// the scan stops as soon as the running total passes the threshold. An
/// image without colors never matches.
pub fn matches_color(target: &Hsl, colors: &[DominantColor]) -> bool {
    if colors.is_empty() {
        return false;
    }
    let mut distance = 0.0;
    for color in colors {
        distance += color.hsl().distance(target) * color.area;
        if distance > QueryConfig::COLOR_DISTANCE_THRESHOLD {
            return false;
        }
    }
    true
}
