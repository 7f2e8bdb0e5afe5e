//! Image decoding and dominant-color extraction.

use super::color::rgb_to_hsl;
use super::{DominantColor, ImageSize};
use crate::config::AnalysisConfig;
use crate::error::Result;
use image::{GenericImageView, ImageReader};
use std::collections::HashMap;
use std::io::Cursor;

/// Pure functions from encoded image bytes to derived values.
///
/// Implementations may be expensive; callers run them on the blocking pool.
pub trait ImageAnalyzer: Send + Sync {
    fn dimensions(&self, bytes: &[u8]) -> Result<ImageSize>;

    fn dominant_colors(&self, bytes: &[u8]) -> Result<Vec<DominantColor>>;
}

/// [`ImageAnalyzer`] backed by the `image` crate.
///
/// Colors are found by down-sampling, bucketing each pixel at 4 bits per
/// channel and greedily merging buckets that sit close together in HSL.
#[derive(Debug, Clone, Default)]
pub struct PixelAnalyzer;

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    count: u64,
    r: u64,
    g: u64,
    b: u64,
}

impl Bucket {
    fn add(&mut self, other: &Bucket) {
        self.count += other.count;
        self.r += other.r;
        self.g += other.g;
        self.b += other.b;
    }

    fn mean(&self) -> (u8, u8, u8) {
        let n = self.count.max(1);
        ((self.r / n) as u8, (self.g / n) as u8, (self.b / n) as u8)
    }
}

impl ImageAnalyzer for PixelAnalyzer {
    fn dimensions(&self, bytes: &[u8]) -> Result<ImageSize> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(ImageSize { width, height })
    }

    fn dominant_colors(&self, bytes: &[u8]) -> Result<Vec<DominantColor>> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;

        let (width, height) = image.dimensions();
        let total = u64::from(width) * u64::from(height);
        let max = u64::from(AnalysisConfig::MAX_SAMPLED_PIXELS);
        let image = if total > max {
            let scale = (max as f64 / total as f64).sqrt();
            let w = ((f64::from(width) * scale) as u32).max(1);
            let h = ((f64::from(height) * scale) as u32).max(1);
            image.thumbnail_exact(w, h)
        } else {
            image
        };

        let mut buckets: HashMap<u16, Bucket> = HashMap::new();
        let mut sampled: u64 = 0;
        for pixel in image.to_rgba8().pixels() {
            let [r, g, b, a] = pixel.0;
            if a < 128 {
                continue;
            }
            sampled += 1;
            let key = (u16::from(r >> 4) << 8) | (u16::from(g >> 4) << 4) | u16::from(b >> 4);
            let bucket = buckets.entry(key).or_default();
            bucket.count += 1;
            bucket.r += u64::from(r);
            bucket.g += u64::from(g);
            bucket.b += u64::from(b);
        }

        if sampled == 0 {
            return Ok(Vec::new());
        }

        let mut ordered: Vec<Bucket> = buckets.into_values().collect();
        ordered.sort_by(|a, b| b.count.cmp(&a.count));

        let mut clusters: Vec<Bucket> = Vec::new();
        for bucket in &ordered {
            let (r, g, b) = bucket.mean();
            let hsl = rgb_to_hsl(r, g, b);
            let close = clusters.iter_mut().find(|c| {
                let (cr, cg, cb) = c.mean();
                rgb_to_hsl(cr, cg, cb).distance(&hsl) < AnalysisConfig::MERGE_DISTANCE
            });
            match close {
                Some(cluster) => cluster.add(bucket),
                None => clusters.push(*bucket),
            }
        }

        clusters.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(clusters
            .iter()
            .map(|c| {
                let (r, g, b) = c.mean();
                let hsl = rgb_to_hsl(r, g, b);
                DominantColor {
                    hue: hsl.hue,
                    saturation: hsl.saturation,
                    lightness: hsl.lightness,
                    area: c.count as f64 / sampled as f64,
                }
            })
            .filter(|c| c.area >= AnalysisConfig::MIN_AREA)
            .take(AnalysisConfig::MAX_DOMINANT_COLORS)
            .collect())
    }
}
