use crate::foundation::core::Canvas;
use crate::foundation::error::{DrapeError, DrapeResult};

/// Bounds used to fit the base image into the working area.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SizerOpts {
    /// Upper bound on output width, before the viewport bound applies.
    pub max_width: f64,
    /// Fraction of the viewport width the output may occupy.
    pub viewport_fraction: f64,
    pub max_height: f64,
}

impl Default for SizerOpts {
    fn default() -> Self {
        Self {
            max_width: 800.0,
            viewport_fraction: 0.8,
            max_height: 500.0,
        }
    }
}

impl SizerOpts {
    pub fn validate(&self) -> DrapeResult<()> {
        for (name, v) in [
            ("sizer.max_width", self.max_width),
            ("sizer.viewport_fraction", self.viewport_fraction),
            ("sizer.max_height", self.max_height),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(DrapeError::validation(format!(
                    "{name} must be finite and > 0, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// Compute output raster dimensions for a base image of natural size `natural_w x natural_h`.
///
/// The ratio is never clamped to 1, so small images are upscaled to fill the bounds. Each output
/// dimension is rounded and kept at least one pixel.
pub fn size_canvas(
    natural_w: u32,
    natural_h: u32,
    viewport_width: u32,
    opts: &SizerOpts,
) -> DrapeResult<Canvas> {
    if natural_w == 0 || natural_h == 0 {
        return Err(DrapeError::validation(format!(
            "base image natural size must be non-zero, got {natural_w}x{natural_h}"
        )));
    }

    let max_width = opts
        .max_width
        .min(f64::from(viewport_width) * opts.viewport_fraction);
    let max_height = opts.max_height;
    let ratio = (max_width / f64::from(natural_w)).min(max_height / f64::from(natural_h));

    let width = to_dim(f64::from(natural_w) * ratio);
    let height = to_dim(f64::from(natural_h) * ratio);
    tracing::debug!(natural_w, natural_h, viewport_width, ratio, width, height, "sized canvas");
    Ok(Canvas { width, height })
}

fn to_dim(v: f64) -> u32 {
    if !v.is_finite() {
        return 1;
    }
    v.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/render/sizer.rs"]
mod tests;
