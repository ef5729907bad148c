use anyhow::Context;

use crate::{foundation::error::DrapeResult, render::raster::RasterImage};

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) into a straight-alpha RGBA8 raster.
pub fn decode_image(bytes: &[u8]) -> DrapeResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    RasterImage::from_rgba_image(dyn_img.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
