//! Text-to-bitmap rendering for asciiframes.
//!
//! Resolves a monospace font through a fallback chain and rasterizes ASCII
//! grids into RGB images, one glyph cell per character.

pub mod font;
pub mod rasterizer;

pub use font::{FontChain, FontSource, ResolvedFont};
pub use rasterizer::{CellSize, Rasterizer, ascii_to_png, canvas_size, save_ascii_png};
