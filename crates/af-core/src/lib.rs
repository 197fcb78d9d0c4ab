//! Settings, schema, colors, ramps and errors for asciiframes.
//!
//! This crate contains all shared types and configuration logic used
//! across the asciiframes workspace.

pub mod charset;
pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod schema;
pub mod settings;

pub use charset::RampLut;
pub use color::Rgb;
pub use config::AppConfig;
pub use error::{AsciiError, Result};
pub use grid::AsciiGrid;
pub use settings::Settings;
