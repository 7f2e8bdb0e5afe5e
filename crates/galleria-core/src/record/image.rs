//! Cached values of image records.
//!
//! Size and dominant colors are persisted into the sidecar under reserved
//! fields so they are decoded once per file revision.

use crate::config::SidecarConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::media::{DominantColor, ImageSize};
use crate::sidecar::Sidecar;
use serde_yaml::Value;
use tracing::{debug, warn};

/// `MC-size` as `[width, height]`; anything else reads as not cached.
pub fn read_size(sidecar: &Sidecar) -> Option<ImageSize> {
    let value = sidecar.get_field(SidecarConfig::SIZE_FIELD)?;
    let [width, height] = serde_yaml::from_value::<[u32; 2]>(value.clone()).ok()?;
    Some(ImageSize { width, height })
}

/// `MC-colors` as a list of `{hue, saturation, lightness, area}`.
pub fn read_colors(sidecar: &Sidecar) -> Option<Vec<DominantColor>> {
    let value = sidecar.get_field(SidecarConfig::COLORS_FIELD)?;
    serde_yaml::from_value(value.clone()).ok()
}

/// Compute and store whichever cached values are missing, or all of them
/// when `force` is set. Returns whether anything was written.
///
/// Analysis failures are logged and leave the field uncached.
pub(crate) async fn refresh(
    ctx: &AppContext,
    path: &str,
    sidecar: &mut Sidecar,
    force: bool,
) -> Result<bool> {
    let need_size = force || read_size(sidecar).is_none();
    let need_colors = force || read_colors(sidecar).is_none();
    if !need_size && !need_colors {
        return Ok(false);
    }

    let vault = ctx.vault();
    let bytes = vault.read(path).await?;
    let analyzer = ctx.analyzer();
    debug!(
        "Analyzing {} (size: {}, colors: {})",
        path, need_size, need_colors
    );
    let (size, colors) = tokio::task::spawn_blocking(move || {
        let size = need_size.then(|| analyzer.dimensions(&bytes));
        let colors = need_colors.then(|| analyzer.dominant_colors(&bytes));
        (size, colors)
    })
    .await?;

    let mut written = false;

    match size {
        Some(Ok(size)) => {
            let value = Value::Sequence(vec![size.width.into(), size.height.into()]);
            written |= sidecar
                .set_field(vault, SidecarConfig::SIZE_FIELD, value, None)
                .await;
        }
        Some(Err(e)) => warn!("Failed to read size of {}: {}", path, e),
        None => {}
    }

    match colors {
        Some(Ok(colors)) => {
            let value = serde_yaml::to_value(&colors)?;
            written |= sidecar
                .set_field(vault, SidecarConfig::COLORS_FIELD, value, None)
                .await;
        }
        Some(Err(e)) => warn!("Failed to extract colors of {}: {}", path, e),
        None => {}
    }

    Ok(written)
}
