use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbImage};

/// Encode an RGB buffer filled by the `plotters` bitmap backend as PNG.
pub(crate) fn save_png(buf: Vec<u8>, width: u32, height: u32, path: &Path) -> Result<()> {
    let img = RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| anyhow!("pixel buffer does not match {}x{}", width, height))?;
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG to {}", path.display()))
}
