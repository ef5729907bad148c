use crate::effects::composite::premultiply_rgba8_in_place;
use crate::foundation::core::{Canvas, UserScale};
use crate::foundation::error::{DrapeError, DrapeResult};
use crate::render::raster::RasterImage;

/// Tile layer sizing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TileOpts {
    /// Edge length, in output pixels, of one pattern repetition at 100% user scale.
    pub base_pattern_size: f64,
}

impl Default for TileOpts {
    fn default() -> Self {
        Self {
            base_pattern_size: 300.0,
        }
    }
}

impl TileOpts {
    pub fn validate(&self) -> DrapeResult<()> {
        let v = self.base_pattern_size;
        if !v.is_finite() || v <= 0.0 {
            return Err(DrapeError::validation(format!(
                "tile.base_pattern_size must be finite and > 0, got {v}"
            )));
        }
        Ok(())
    }
}

/// Horizontal and vertical scale applied to each pattern repetition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileScale {
    pub x: f64,
    pub y: f64,
}

impl TileScale {
    /// Size of one scaled repetition in output pixels.
    pub fn cell_size(self, pattern_w: u32, pattern_h: u32) -> (f64, f64) {
        (f64::from(pattern_w) * self.x, f64::from(pattern_h) * self.y)
    }
}

/// Scale that maps the pattern's natural size onto `base_pattern_size`, adjusted by `user_scale`.
pub fn tile_scale(
    pattern_w: u32,
    pattern_h: u32,
    user_scale: UserScale,
    opts: &TileOpts,
) -> DrapeResult<TileScale> {
    if pattern_w == 0 || pattern_h == 0 {
        return Err(DrapeError::validation(
            "pattern natural size must be non-zero",
        ));
    }
    let scale_x = opts.base_pattern_size / f64::from(pattern_w);
    let scale_y = opts.base_pattern_size / f64::from(pattern_h);
    Ok(TileScale {
        x: scale_x * user_scale.factor(),
        y: scale_y * user_scale.factor(),
    })
}

/// Render the tile layer: `pattern` repeated at the computed scale over exactly `target`.
#[tracing::instrument(skip(pattern, opts), fields(pattern_w = pattern.width(), pattern_h = pattern.height()))]
pub fn render_tile(
    pattern: &RasterImage,
    user_scale: UserScale,
    target: Canvas,
    opts: &TileOpts,
) -> DrapeResult<RasterImage> {
    let scale = tile_scale(pattern.width(), pattern.height(), user_scale, opts)?;
    tracing::debug!(scale_x = scale.x, scale_y = scale.y, "tile scale");
    fill_repeat(pattern, scale, target)
}

/// Fill a `target`-sized raster with `pattern` repeated at `scale`, anchored at the origin.
///
/// Sampling is bilinear with wrap-around in premultiplied space. The result carries the sampled
/// color with alpha forced to 255; only its RGB channels feed the blend.
pub fn fill_repeat(pattern: &RasterImage, scale: TileScale, target: Canvas) -> DrapeResult<RasterImage> {
    if !(scale.x.is_finite() && scale.y.is_finite() && scale.x > 0.0 && scale.y > 0.0) {
        return Err(DrapeError::validation(format!(
            "tile scale must be finite and > 0, got ({}, {})",
            scale.x, scale.y
        )));
    }

    let mut premul = pattern.data().to_vec();
    premultiply_rgba8_in_place(&mut premul);

    let pw = pattern.width() as usize;
    let cols = axis_taps(target.width, pattern.width(), scale.x);
    let rows = axis_taps(target.height, pattern.height(), scale.y);

    let mut out = RasterImage::new(target.width, target.height)?;
    let tw = target.width as usize;
    for (y, row) in out.data_mut().chunks_exact_mut(tw * 4).enumerate() {
        let ry = rows[y];
        let r0 = ry.i0 * pw;
        let r1 = ry.i1 * pw;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let cx = cols[x];
            let p00 = (r0 + cx.i0) * 4;
            let p10 = (r0 + cx.i1) * 4;
            let p01 = (r1 + cx.i0) * 4;
            let p11 = (r1 + cx.i1) * 4;

            let w00 = (1.0 - cx.f) * (1.0 - ry.f);
            let w10 = cx.f * (1.0 - ry.f);
            let w01 = (1.0 - cx.f) * ry.f;
            let w11 = cx.f * ry.f;

            let mut acc = [0.0f64; 4];
            for (c, a) in acc.iter_mut().enumerate() {
                *a = f64::from(premul[p00 + c]) * w00
                    + f64::from(premul[p10 + c]) * w10
                    + f64::from(premul[p01 + c]) * w01
                    + f64::from(premul[p11 + c]) * w11;
            }

            let alpha = acc[3];
            for (dst, &v) in px[..3].iter_mut().zip(&acc[..3]) {
                *dst = if alpha <= 0.0 {
                    0
                } else {
                    (v * 255.0 / alpha).round().clamp(0.0, 255.0) as u8
                };
            }
            px[3] = 255;
        }
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug)]
struct Tap {
    i0: usize,
    i1: usize,
    f: f64,
}

// Source taps for each output column (or row), wrapped into the pattern.
fn axis_taps(out_len: u32, src_len: u32, scale: f64) -> Vec<Tap> {
    let n = i64::from(src_len);
    (0..out_len)
        .map(|o| {
            let u = (f64::from(o) + 0.5) / scale - 0.5;
            let base = u.floor();
            let f = u - base;
            let i0 = (base as i64).rem_euclid(n);
            let i1 = (i0 + 1).rem_euclid(n);
            Tap {
                i0: i0 as usize,
                i1: i1 as usize,
                f,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/render/tile.rs"]
mod tests;
