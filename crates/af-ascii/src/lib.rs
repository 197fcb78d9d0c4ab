//! ASCII conversion engine for asciiframes.
//!
//! Converts decoded images to ASCII character grids.
pub mod luminance;

pub use luminance::{Quantizer, image_to_ascii, image_to_grid};
