use image::imageops::{self, FilterType};

use crate::effects::composite::{
    over_in_place, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place,
};
use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{DrapeError, DrapeResult};
use crate::render::raster::RasterImage;

/// Drawable raster target the composite engine paints into.
///
/// The engine is the only writer while a composite is in flight.
pub trait RasterSurface {
    /// Current surface dimensions.
    fn canvas(&self) -> Canvas;

    /// Reallocate to `canvas`; contents become fully transparent.
    fn resize(&mut self, canvas: Canvas) -> DrapeResult<()>;

    /// Set every pixel inside `rect` (clipped to the surface) to transparent black.
    fn clear(&mut self, rect: PixelRect);

    /// Draw `image` at the origin, resampled to `width x height`, source-over.
    fn draw_image_scaled(&mut self, image: &RasterImage, width: u32, height: u32) -> DrapeResult<()>;

    /// Copy out the current pixels.
    fn read_pixels(&self) -> RasterImage;

    /// Replace the surface pixels; `pixels` must match the surface size.
    fn write_pixels(&mut self, pixels: &RasterImage) -> DrapeResult<()>;
}

/// In-memory CPU surface.
#[derive(Clone, Debug)]
pub struct CpuSurface {
    pixels: RasterImage,
}

impl CpuSurface {
    pub fn new(canvas: Canvas) -> DrapeResult<Self> {
        Ok(Self {
            pixels: RasterImage::new(canvas.width, canvas.height)?,
        })
    }

    pub fn pixels(&self) -> &RasterImage {
        &self.pixels
    }
}

impl RasterSurface for CpuSurface {
    fn canvas(&self) -> Canvas {
        self.pixels.canvas()
    }

    fn resize(&mut self, canvas: Canvas) -> DrapeResult<()> {
        self.pixels = RasterImage::new(canvas.width, canvas.height)?;
        Ok(())
    }

    fn clear(&mut self, rect: PixelRect) {
        let Canvas { width, height } = self.pixels.canvas();
        let x0 = rect.x.min(width) as usize;
        let x1 = rect.x.saturating_add(rect.width).min(width) as usize;
        let y0 = rect.y.min(height);
        let y1 = rect.y.saturating_add(rect.height).min(height);
        if x0 >= x1 {
            return;
        }
        let stride = width as usize * 4;
        let data = self.pixels.data_mut();
        for y in y0..y1 {
            let row = y as usize * stride;
            data[row + x0 * 4..row + x1 * 4].fill(0);
        }
    }

    fn draw_image_scaled(&mut self, image: &RasterImage, width: u32, height: u32) -> DrapeResult<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        let scaled = if (image.width(), image.height()) == (width, height) {
            image.clone()
        } else {
            resample_premultiplied(image, width, height)?
        };

        let Canvas {
            width: sw,
            height: sh,
        } = self.pixels.canvas();
        let cw = width.min(sw) as usize;
        let ch = height.min(sh) as usize;
        let src_stride = width as usize * 4;
        let dst_stride = sw as usize * 4;
        let dst = self.pixels.data_mut();
        for y in 0..ch {
            let s = &scaled.data()[y * src_stride..y * src_stride + cw * 4];
            let d = &mut dst[y * dst_stride..y * dst_stride + cw * 4];
            over_in_place(d, s)?;
        }
        Ok(())
    }

    fn read_pixels(&self) -> RasterImage {
        self.pixels.clone()
    }

    fn write_pixels(&mut self, pixels: &RasterImage) -> DrapeResult<()> {
        if pixels.canvas() != self.pixels.canvas() {
            return Err(DrapeError::evaluation(format!(
                "write_pixels size {}x{} does not match surface {}x{}",
                pixels.width(),
                pixels.height(),
                self.pixels.width(),
                self.pixels.height()
            )));
        }
        self.pixels.data_mut().copy_from_slice(pixels.data());
        Ok(())
    }
}

// Bilinear resample with premultiplied intermediates so transparent texels do not bleed color.
fn resample_premultiplied(image: &RasterImage, width: u32, height: u32) -> DrapeResult<RasterImage> {
    let mut premul = image.data().to_vec();
    premultiply_rgba8_in_place(&mut premul);
    let src = image::RgbaImage::from_raw(image.width(), image.height(), premul)
        .ok_or_else(|| DrapeError::evaluation("raster buffer does not fit an RgbaImage"))?;
    let mut out = imageops::resize(&src, width, height, FilterType::Triangle).into_raw();
    unpremultiply_rgba8_in_place(&mut out);
    RasterImage::from_raw(width, height, out)
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
