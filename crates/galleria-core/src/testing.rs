//! Shared fixtures for unit tests.

use crate::context::AppContext;
use crate::error::{GalleriaError, Result};
use crate::media::{DominantColor, ImageAnalyzer, ImageSize};
use crate::settings::Settings;
use crate::vault::Vault;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Analyzer returning a fixed size and a single red color, counting calls.
///
/// Inputs whose first byte is `0xFF` fail to decode.
pub(crate) struct CountingAnalyzer {
    pub dimension_calls: AtomicUsize,
    pub color_calls: AtomicUsize,
    size: ImageSize,
}

impl CountingAnalyzer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimension_calls: AtomicUsize::new(0),
            color_calls: AtomicUsize::new(0),
            size: ImageSize { width, height },
        }
    }
}

impl ImageAnalyzer for CountingAnalyzer {
    fn dimensions(&self, bytes: &[u8]) -> Result<ImageSize> {
        self.dimension_calls.fetch_add(1, Ordering::SeqCst);
        if bytes.first() == Some(&0xFF) {
            return Err(GalleriaError::ImageDecode {
                message: "corrupt".into(),
                source: None,
            });
        }
        Ok(self.size)
    }

    fn dominant_colors(&self, bytes: &[u8]) -> Result<Vec<DominantColor>> {
        self.color_calls.fetch_add(1, Ordering::SeqCst);
        if bytes.first() == Some(&0xFF) {
            return Err(GalleriaError::ImageDecode {
                message: "corrupt".into(),
                source: None,
            });
        }
        Ok(vec![DominantColor {
            hue: 0.0,
            saturation: 1.0,
            lightness: 0.5,
            area: 1.0,
        }])
    }
}

pub(crate) fn test_context(vault: Arc<dyn Vault>, analyzer: Arc<dyn ImageAnalyzer>) -> AppContext {
    AppContext::new(vault, Settings::default(), analyzer)
}
