use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::charset::RAMP_DEFAULT;
use crate::color::Rgb;
use crate::error::{AsciiError, Result};

/// Réglages d'une conversion image ⇄ ASCII.
///
/// Valeur immuable passée à chaque appel du quantizer et du rasterizer.
/// Sérialisable en TOML/JSON ; chaque champ a une valeur par défaut.
///
/// # Example
/// ```
/// use af_core::Settings;
/// let s = Settings::default();
/// assert_eq!(s.output_width, 120);
/// assert_eq!(s.ascii_chars, "@%#*+=-:. ");
/// assert!(s.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Target sample columns.
    pub output_width: u32,
    /// Ramp of glyphs, index 0 used for the lowest non-blanked intensity.
    pub ascii_chars: String,
    /// Intensities `<=` this value render as a blank. Negative disables.
    pub black_threshold: i32,
    /// Flip intensity (`255 - v`) before mapping.
    pub invert: bool,
    /// Glyph cell width/height correction applied when resampling.
    pub char_aspect: f32,
    /// Preferred font file. Falls back through the platform defaults.
    pub font_path: Option<PathBuf>,
    /// Font size in pixels.
    pub font_size: u32,
    /// Glyph color of the rendered image.
    pub fg_color: String,
    /// Background color of the rendered image.
    pub bg_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_width: 120,
            ascii_chars: RAMP_DEFAULT.to_string(),
            black_threshold: 15,
            invert: false,
            char_aspect: 0.55,
            font_path: None,
            font_size: 12,
            fg_color: "black".to_string(),
            bg_color: "white".to_string(),
        }
    }
}

impl Settings {
    /// Clamp numeric fields to their valid ranges.
    /// Called after deserialization, before validation.
    pub fn clamp_all(&mut self) {
        self.black_threshold = self.black_threshold.clamp(-1, 255);
    }

    /// Check every invariant.
    ///
    /// # Errors
    /// Returns `InvalidSettings` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        crate::schema::FIELDS
            .iter()
            .try_for_each(|field| field.check(self))
    }

    /// Number of sample rows for a source of `src_w × src_h` pixels.
    ///
    /// `max(1, round(output_width * src_h / src_w * char_aspect))`.
    ///
    /// # Example
    /// ```
    /// use af_core::Settings;
    /// let s = Settings { output_width: 10, char_aspect: 0.55, ..Settings::default() };
    /// assert_eq!(s.computed_height(100, 50), 3);
    /// assert_eq!(s.computed_height(1000, 1), 1);
    /// ```
    #[must_use]
    pub fn computed_height(&self, src_w: u32, src_h: u32) -> u32 {
        if src_w == 0 {
            return 1;
        }
        let ratio = f64::from(src_h) / f64::from(src_w);
        let h = (f64::from(self.output_width) * ratio * f64::from(self.char_aspect)).round();
        if h.is_finite() && h >= 1.0 {
            h.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }

    /// Parsed glyph color.
    ///
    /// # Errors
    /// Returns `InvalidSettings` if `fg_color` is not a color.
    pub fn fg(&self) -> Result<Rgb> {
        Rgb::parse(&self.fg_color)
    }

    /// Parsed background color.
    ///
    /// # Errors
    /// Returns `InvalidSettings` if `bg_color` is not a color.
    pub fn bg(&self) -> Result<Rgb> {
        Rgb::parse(&self.bg_color)
    }

    /// Number of glyphs in the ramp (Unicode scalar values).
    #[must_use]
    pub fn ramp_len(&self) -> usize {
        self.ascii_chars.chars().count()
    }
}

pub(crate) fn invalid(field: &str, reason: &str) -> AsciiError {
    AsciiError::InvalidSettings(format!("{field} : {reason}"))
}
