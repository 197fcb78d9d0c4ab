//! Frame sources for asciiframes: decoding, folder listing, resampling.

pub mod folder;
pub mod image;
pub mod resize;
