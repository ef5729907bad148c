//! Session state and the composite engine that owns the output raster.

pub(crate) mod engine;
pub(crate) mod job;
pub(crate) mod state;
