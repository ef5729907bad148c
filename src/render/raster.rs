use std::path::Path;

use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{DrapeError, DrapeResult};
use crate::foundation::math::Fnv1a64;

/// An RGBA8 raster with straight (non-premultiplied) alpha.
///
/// Pixels are tightly packed in row-major order. The buffer length is always
/// `width * height * 4` and both dimensions are non-zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    /// Allocate a fully transparent raster.
    pub fn new(width: u32, height: u32) -> DrapeResult<Self> {
        let len = checked_byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wrap an existing RGBA8 buffer, checking it matches the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> DrapeResult<Self> {
        let len = checked_byte_len(width, height)?;
        if data.len() != len {
            return Err(DrapeError::validation(format!(
                "raster buffer length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Raster filled with a single straight RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> DrapeResult<Self> {
        let len = checked_byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: rgba.repeat(len / 4),
        })
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> DrapeResult<Self> {
        let (width, height) = img.dimensions();
        Self::from_raw(width, height, img.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the pixel bytes. The length cannot change through a slice.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Stable 64-bit FNV-1a digest over dimensions and pixel bytes.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.width);
        h.write_u32(self.height);
        h.write_bytes(&self.data);
        h.finish()
    }

    pub fn to_rgba_image(&self) -> DrapeResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| DrapeError::evaluation("raster buffer does not fit an RgbaImage"))
    }

    /// Encode as PNG at `path`, creating parent directories as needed.
    pub fn save_png(&self, path: impl AsRef<Path>) -> DrapeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

fn checked_byte_len(width: u32, height: u32) -> DrapeResult<usize> {
    if width == 0 || height == 0 {
        return Err(DrapeError::validation(format!(
            "raster dimensions must be non-zero, got {width}x{height}"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| DrapeError::validation("raster buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
