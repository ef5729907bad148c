//! Image loading: byte decoding and reference resolution.

pub(crate) mod decode;
pub(crate) mod source;
