use std::fmt;

use crate::foundation::error::{DrapeError, DrapeResult};

/// Output raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    pub fn byte_len(self) -> usize {
        self.pixel_count().saturating_mul(4)
    }
}

/// Opaque reference an [`crate::ImageSource`] resolves into pixels (a relative path, a key...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Axis-aligned pixel rectangle, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn from_canvas(canvas: Canvas) -> Self {
        Self {
            x: 0,
            y: 0,
            width: canvas.width,
            height: canvas.height,
        }
    }
}

/// User-selected pattern scale as an integer percentage in `[10, 200]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserScale(u32);

impl UserScale {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 200;

    pub fn new(percent: u32) -> DrapeResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&percent) {
            return Err(DrapeError::InvalidScale(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(self) -> u32 {
        self.0
    }

    /// Scale as a multiplier (`100%` is `1.0`).
    pub fn factor(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for UserScale {
    fn default() -> Self {
        Self(50)
    }
}
