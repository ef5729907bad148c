use std::fmt;

use rayon::prelude::*;

use crate::foundation::error::{DrapeError, DrapeResult};
use crate::foundation::math::store_channel;

/// Per-channel blend formula used when folding the tile layer into the base.
///
/// Parsing is total: any name other than the known ones selects [`BlendMode::Normal`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlendMode {
    /// `255 - (255 - src)(255 - dst) / 255`
    Screen,
    /// Multiply below mid-grey, screen above, keyed on the base channel.
    Overlay,
    /// Arithmetic mean of the two channels.
    #[default]
    Normal,
}

impl BlendMode {
    pub const ALL: [BlendMode; 3] = [BlendMode::Screen, BlendMode::Overlay, BlendMode::Normal];

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "screen" => Self::Screen,
            "overlay" => Self::Overlay,
            _ => Self::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for BlendMode {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<BlendMode> for String {
    fn from(m: BlendMode) -> Self {
        m.as_str().to_string()
    }
}

impl std::str::FromStr for BlendMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Combine one base channel (`src`) with one tile channel (`dst`).
///
/// The result is real-valued and unclamped; see [`blend_channel`] for the byte store.
pub fn blend(src: u8, dst: u8, mode: BlendMode) -> f64 {
    let s = f64::from(src);
    let d = f64::from(dst);
    match mode {
        BlendMode::Screen => 255.0 - ((255.0 - s) * (255.0 - d)) / 255.0,
        BlendMode::Overlay => {
            if src < 128 {
                (s * d * 2.0) / 255.0
            } else {
                255.0 - (2.0 * (255.0 - s) * (255.0 - d)) / 255.0
            }
        }
        BlendMode::Normal => (s + d) / 2.0,
    }
}

/// [`blend`] stored into a byte channel (clamped, rounded half to even).
pub fn blend_channel(src: u8, dst: u8, mode: BlendMode) -> u8 {
    store_channel(blend(src, dst, mode))
}

/// Blend `tile` RGB into `working` RGB wherever the working pixel has non-zero alpha.
///
/// Alpha is never touched and fully transparent pixels are left bit-identical.
pub fn blend_rgb_in_place(working: &mut [u8], tile: &[u8], mode: BlendMode) -> DrapeResult<()> {
    check_buffers(working, tile)?;
    for (w, t) in working.chunks_exact_mut(4).zip(tile.chunks_exact(4)) {
        blend_px(w, t, mode);
    }
    Ok(())
}

/// Row-parallel variant of [`blend_rgb_in_place`]; output is identical.
pub fn par_blend_rgb_in_place(
    working: &mut [u8],
    tile: &[u8],
    mode: BlendMode,
    chunk_px: usize,
) -> DrapeResult<()> {
    check_buffers(working, tile)?;
    let chunk = chunk_px.max(1) * 4;
    working
        .par_chunks_mut(chunk)
        .zip(tile.par_chunks(chunk))
        .for_each(|(w, t)| {
            for (wp, tp) in w.chunks_exact_mut(4).zip(t.chunks_exact(4)) {
                blend_px(wp, tp, mode);
            }
        });
    Ok(())
}

#[inline]
fn blend_px(w: &mut [u8], t: &[u8], mode: BlendMode) {
    if w[3] == 0 {
        return;
    }
    w[0] = blend_channel(w[0], t[0], mode);
    w[1] = blend_channel(w[1], t[1], mode);
    w[2] = blend_channel(w[2], t[2], mode);
}

fn check_buffers(working: &[u8], tile: &[u8]) -> DrapeResult<()> {
    if working.len() != tile.len() || !working.len().is_multiple_of(4) {
        return Err(DrapeError::evaluation(
            "blend expects equal-length rgba8 buffers",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend.rs"]
mod tests;
