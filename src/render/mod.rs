//! Raster storage, canvas sizing, tile generation and the drawable surface.

pub(crate) mod raster;
pub(crate) mod sizer;
pub(crate) mod surface;
pub(crate) mod tile;
