//! CLI command implementations

pub mod apply;
pub mod hald;
pub mod params;

use anyhow::{bail, Context, Result};
use clut_core::PlanarImage;
use std::path::Path;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Load an image as planar RGB on the 16-bit scale
pub fn load_image(path: &Path) -> Result<PlanarImage> {
    let data = clut_io::read(path).with_context(|| format!("Failed to load: {}", path.display()))?;
    PlanarImage::from_interleaved(data.width as usize, data.height as usize, data.channels, &data.data)
        .with_context(|| format!("Bad image layout: {}", path.display()))
}

/// Save planar RGB as a 16-bit PNG or TIFF, by extension
pub fn save_image(path: &Path, image: &PlanarImage) -> Result<()> {
    let samples: Vec<u16> = image
        .to_interleaved()
        .iter()
        .map(|v| v.round().clamp(0.0, 65535.0) as u16)
        .collect();
    let (w, h) = (image.width() as u32, image.height() as u32);
    let result = match extension(path).as_str() {
        "png" => clut_io::png::write_rgb16(path, w, h, &samples),
        "tif" | "tiff" => clut_io::tiff::write_rgb16(path, w, h, &samples),
        ext => bail!("Unsupported output format: .{}", ext),
    };
    result.with_context(|| format!("Failed to save: {}", path.display()))
}

/// Check a file exists before handing it to the store, which only logs
pub fn ensure_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        bail!("{} not found: {}", what, path.display());
    }
    Ok(())
}
