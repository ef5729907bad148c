//! drape tiles a pattern image across a product image and blends it in per channel.
//!
//! # Pipeline overview
//!
//! 1. **Load**: an [`ImageSource`] resolves an [`ImageRef`] into a straight-alpha [`RasterImage`]
//! 2. **Size**: [`size_canvas`] fits the base image into the working area, preserving aspect ratio
//! 3. **Draw**: the base is drawn scaled into a [`RasterSurface`]
//! 4. **Tile**: [`render_tile`] repeats the pattern over the output at the user's scale
//! 5. **Blend**: [`blend`] folds the tile layer into every non-transparent base pixel
//!
//! [`CompositeEngine`] sequences these steps and re-runs them on every setter call. A one-shot
//! [`CompositeJob`] can be described in JSON and run against any source.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: identical state and decodes yield byte-identical output.
//! - **Straight RGBA8** at every API boundary; alpha is never blended.
#![forbid(unsafe_code)]

mod assets;
mod effects;
mod foundation;
mod render;
mod session;

pub use crate::assets::decode::decode_image;
pub use crate::assets::source::{FsImageSource, ImageSource, MemoryImageSource, normalize_rel_path};
pub use crate::effects::blend::{
    BlendMode, blend, blend_channel, blend_rgb_in_place, par_blend_rgb_in_place,
};
pub use crate::effects::composite::{StraightRgba8, over, over_in_place};
pub use crate::foundation::core::{Canvas, ImageRef, PixelRect, UserScale};
pub use crate::foundation::error::{DrapeError, DrapeResult, LoadError};
pub use crate::render::raster::RasterImage;
pub use crate::render::sizer::{SizerOpts, size_canvas};
pub use crate::render::surface::{CpuSurface, RasterSurface};
pub use crate::render::tile::{TileOpts, TileScale, fill_repeat, render_tile, tile_scale};
pub use crate::session::engine::{
    CompositeEngine, DEFAULT_VIEWPORT_WIDTH, EngineOpts, EnginePhase,
};
pub use crate::session::job::CompositeJob;
pub use crate::session::state::CompositeState;
