use af_core::charset::RampLut;
use af_core::error::{AsciiError, Result};
use af_core::grid::AsciiGrid;
use af_core::settings::Settings;
use af_source::resize::Resizer;
use image::DynamicImage;

/// Quantizer image → grille ASCII.
///
/// Garde un `Resizer` pré-alloué pour enchaîner les frames d'un lot sans
/// le recréer. Chaque appel reste une fonction pure de (image, réglages).
///
/// # Example
/// ```
/// use af_ascii::Quantizer;
/// use af_core::Settings;
/// use image::{DynamicImage, GrayImage, Luma};
///
/// let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])));
/// let settings = Settings { output_width: 4, char_aspect: 1.0, ..Settings::default() };
/// let grid = Quantizer::new().quantize(&img, &settings).unwrap();
/// assert_eq!(grid.to_text(), "    \n    \n    \n    ");
/// ```
#[derive(Default)]
pub struct Quantizer {
    resizer: Resizer,
}

impl Quantizer {
    /// Create a quantizer with a fresh resizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `image` to an ASCII grid.
    ///
    /// 1. BT.709 luma (`0.2126 R + 0.7152 G + 0.0722 B`, via `to_luma8`).
    /// 2. Bilinear resample to `output_width × computed_height`.
    /// 3. Per sample, row-major: optional `255 - v`, then blank if
    ///    `v <= black_threshold`, else `ascii_chars[v * len / 256]`.
    /// 4. Rows of exactly `output_width` characters.
    ///
    /// # Errors
    /// `InvalidSettings` for an empty ramp, a zero width or a non-positive
    /// aspect; `InvalidImage` for a zero-sized source.
    pub fn quantize(&mut self, image: &DynamicImage, settings: &Settings) -> Result<AsciiGrid> {
        if settings.output_width < 1 {
            return Err(AsciiError::InvalidSettings(
                "output_width doit être ≥ 1".into(),
            ));
        }
        if !(settings.char_aspect.is_finite() && settings.char_aspect > 0.0) {
            return Err(AsciiError::InvalidSettings(format!(
                "char_aspect invalide : {}",
                settings.char_aspect
            )));
        }
        let lut = RampLut::new(&settings.ascii_chars, settings.black_threshold)
            .ok_or_else(|| AsciiError::InvalidSettings("ascii_chars vide".into()))?;

        let (src_w, src_h) = (image.width(), image.height());
        if src_w == 0 || src_h == 0 {
            return Err(AsciiError::InvalidImage(format!(
                "dimensions nulles {src_w}×{src_h}"
            )));
        }

        let width = settings.output_width;
        let height = settings.computed_height(src_w, src_h);
        log::trace!("Quantization {src_w}×{src_h} → {width}×{height}");

        let luma = image.to_luma8();
        let samples = self.resizer.resize_luma(&luma, width, height)?;

        let invert = settings.invert;
        let chars = samples.pixels().map(|p| {
            let v = if invert { 255 - p.0[0] } else { p.0[0] };
            lut.map(v)
        });

        Ok(AsciiGrid::from_chars(chars, width as usize))
    }
}

/// One-shot conversion to a grid.
///
/// # Errors
/// See [`Quantizer::quantize`].
pub fn image_to_grid(image: &DynamicImage, settings: &Settings) -> Result<AsciiGrid> {
    Quantizer::new().quantize(image, settings)
}

/// One-shot conversion to newline-joined text (no trailing newline).
///
/// # Errors
/// See [`Quantizer::quantize`].
///
/// # Example
/// ```
/// use af_ascii::image_to_ascii;
/// use af_core::Settings;
/// use image::{DynamicImage, GrayImage, Luma};
///
/// let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([200])));
/// let settings = Settings { output_width: 1, ascii_chars: "AB".into(), ..Settings::default() };
/// assert_eq!(image_to_ascii(&img, &settings).unwrap(), "B");
/// ```
pub fn image_to_ascii(image: &DynamicImage, settings: &Settings) -> Result<String> {
    Ok(image_to_grid(image, settings)?.to_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn solid(v: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([v])))
    }

    fn single(ramp: &str, threshold: i32, invert: bool) -> Settings {
        Settings {
            output_width: 1,
            ascii_chars: ramp.into(),
            black_threshold: threshold,
            invert,
            ..Settings::default()
        }
    }

    #[test]
    fn one_pixel_gives_one_char() {
        let s = single("@%#*+=-:. ", 15, false);
        assert_eq!(image_to_ascii(&solid(0), &s).unwrap(), " ");
        assert_eq!(image_to_ascii(&solid(255), &s).unwrap(), " ");
        assert_eq!(image_to_ascii(&solid(16), &s).unwrap(), "@");
        assert_eq!(image_to_ascii(&solid(100), &s).unwrap(), "*");
    }

    #[test]
    fn two_glyph_ramp_buckets() {
        let s = single("AB", -1, false);
        for v in 0..=255u8 {
            let expected = if v < 128 { "A" } else { "B" };
            assert_eq!(image_to_ascii(&solid(v), &s).unwrap(), expected, "v={v}");
        }
    }

    #[test]
    fn threshold_edge() {
        let s = single("AB", 100, false);
        assert_eq!(image_to_ascii(&solid(100), &s).unwrap(), " ");
        assert_eq!(image_to_ascii(&solid(101), &s).unwrap(), "A");
    }

    #[test]
    fn invert_applies_before_threshold() {
        let s = single("AB", 15, true);
        assert_eq!(image_to_ascii(&solid(255), &s).unwrap(), " ");
        assert_eq!(image_to_ascii(&solid(0), &s).unwrap(), "B");
    }

    #[test]
    fn invert_symmetry() {
        let img = GrayImage::from_fn(16, 8, |x, y| Luma([((x * 16 + y * 3) % 256) as u8]));
        let mut flipped = img.clone();
        for p in flipped.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
        let base = Settings {
            output_width: 16,
            char_aspect: 1.0,
            ..Settings::default()
        };
        let plain = image_to_ascii(&DynamicImage::ImageLuma8(img), &base).unwrap();
        let inverted = image_to_ascii(
            &DynamicImage::ImageLuma8(flipped),
            &Settings { invert: true, ..base },
        )
        .unwrap();
        assert_eq!(plain, inverted);
    }

    #[test]
    fn mid_gray_round_trip_grid() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([128, 128, 128])));
        let s = Settings {
            output_width: 10,
            black_threshold: 15,
            ..Settings::default()
        };
        let grid = image_to_grid(&img, &s).unwrap();
        assert_eq!(grid.row_count(), 3);
        let first = grid.rows()[0].chars().next().unwrap();
        assert_ne!(first, ' ');
        for row in grid.rows() {
            assert_eq!(row.chars().count(), 10);
            assert!(row.chars().all(|c| c == first));
        }
        assert_eq!(first, '=');

        let chain = af_export::FontChain::builtin();
        let mut raster = af_export::Rasterizer::with_chain(&s, &chain).unwrap();
        let cell = raster.cell_size();
        let png = raster.render(&grid.to_text()).unwrap();
        assert_eq!(png.width(), 10 * cell.width);
        assert_eq!(png.height(), 3 * cell.height);
    }

    #[test]
    fn idempotent() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(61, 37, |x, y| {
            Rgb([(x * 4) as u8, (y * 6) as u8, ((x + y) * 2) as u8])
        }));
        let s = Settings {
            output_width: 23,
            ..Settings::default()
        };
        let mut q = Quantizer::new();
        let a = q.quantize(&img, &s).unwrap().to_text();
        let b = q.quantize(&img, &s).unwrap().to_text();
        let c = image_to_ascii(&img, &s).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn rows_have_output_width_and_computed_height() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 100, Luma([90])));
        let s = Settings {
            output_width: 40,
            char_aspect: 0.5,
            ..Settings::default()
        };
        let grid = image_to_grid(&img, &s).unwrap();
        assert_eq!(grid.row_count(), 10);
        assert!(grid.rows().iter().all(|r| r.chars().count() == 40));
        assert!(!image_to_ascii(&img, &s).unwrap().ends_with('\n'));
    }

    #[test]
    fn degenerate_aspect_keeps_one_row() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(1000, 1, Luma([90])));
        let s = Settings {
            output_width: 5,
            ..Settings::default()
        };
        assert_eq!(image_to_grid(&img, &s).unwrap().row_count(), 1);
    }

    #[test]
    fn invalid_inputs() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(matches!(
            image_to_ascii(&empty, &Settings::default()),
            Err(AsciiError::InvalidImage(_))
        ));
        let s = Settings {
            ascii_chars: String::new(),
            ..Settings::default()
        };
        assert!(matches!(
            image_to_ascii(&solid(1), &s),
            Err(AsciiError::InvalidSettings(_))
        ));
        let s = Settings {
            output_width: 0,
            ..Settings::default()
        };
        assert!(matches!(
            image_to_ascii(&solid(1), &s),
            Err(AsciiError::InvalidSettings(_))
        ));
    }
}
