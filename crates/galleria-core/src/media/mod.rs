//! Media kinds, image geometry and color analysis.

mod analyzer;
pub mod color;

pub use analyzer::{ImageAnalyzer, PixelAnalyzer};
pub use color::Hsl;

use crate::config::IMAGE_EXTENSIONS;
use serde::{Deserialize, Serialize};

/// Kind of media a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Unknown,
}

impl MediaKind {
    /// Classify by extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Image
        } else {
            MediaKind::Unknown
        }
    }
}

/// Orientation of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Square,
    Horizontal,
    Vertical,
}

impl Shape {
    pub fn from_size(size: ImageSize) -> Self {
        use std::cmp::Ordering;
        match size.width.cmp(&size.height) {
            Ordering::Equal => Shape::Square,
            Ordering::Greater => Shape::Horizontal,
            Ordering::Less => Shape::Vertical,
        }
    }
}

impl std::str::FromStr for Shape {
    type Err = crate::GalleriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "square" => Ok(Shape::Square),
            "horizontal" | "landscape" => Ok(Shape::Horizontal),
            "vertical" | "portrait" => Ok(Shape::Vertical),
            _ => Err(crate::GalleriaError::Validation {
                field: "shape".into(),
                message: format!("unknown shape '{}'", s),
            }),
        }
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One representative color of an image and the share of pixels it covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub area: f64,
}

impl DominantColor {
    pub fn hsl(&self) -> Hsl {
        Hsl {
            hue: self.hue,
            saturation: self.saturation,
            lightness: self.lightness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("avif"), MediaKind::Unknown);
        assert_eq!(MediaKind::from_extension("pdf"), MediaKind::Unknown);
    }

    #[test]
    fn test_shape_from_size() {
        let size = |width, height| ImageSize { width, height };
        assert_eq!(Shape::from_size(size(10, 10)), Shape::Square);
        assert_eq!(Shape::from_size(size(20, 10)), Shape::Horizontal);
        assert_eq!(Shape::from_size(size(10, 20)), Shape::Vertical);
    }

    #[test]
    fn test_shape_parse() {
        assert_eq!("Landscape".parse::<Shape>().unwrap(), Shape::Horizontal);
        assert!("round".parse::<Shape>().is_err());
    }
}
