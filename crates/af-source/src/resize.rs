use af_core::error::{AsciiError, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use image::GrayImage;

/// Resizer réutilisable wrappant fast_image_resize, canal unique (luma).
///
/// Filtre bilinéaire par convolution : déterministe pour une entrée donnée.
///
/// # Example
/// ```
/// use af_source::resize::Resizer;
/// let r = Resizer::new();
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
}

impl Resizer {
    /// Create a new bilinear resizer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        }
    }

    /// Resample `src` to `width × height`. Same size → plain copy.
    ///
    /// # Errors
    /// Returns `InvalidImage` if either size has a zero dimension or the
    /// resize operation fails.
    ///
    /// # Example
    /// ```
    /// use af_source::resize::Resizer;
    /// use image::GrayImage;
    /// let mut r = Resizer::new();
    /// let src = GrayImage::new(100, 100);
    /// let dst = r.resize_luma(&src, 50, 25).unwrap();
    /// assert_eq!(dst.dimensions(), (50, 25));
    /// ```
    pub fn resize_luma(&mut self, src: &GrayImage, width: u32, height: u32) -> Result<GrayImage> {
        if src.width() == 0 || src.height() == 0 || width == 0 || height == 0 {
            return Err(AsciiError::InvalidImage(format!(
                "redimensionnement impossible {}×{} → {width}×{height}",
                src.width(),
                src.height()
            )));
        }
        if src.dimensions() == (width, height) {
            return Ok(src.clone());
        }

        // Copie forcée, fast_image_resize veut posséder le buffer source
        let src_image = Image::from_vec_u8(
            src.width(),
            src.height(),
            src.as_raw().clone(),
            PixelType::U8,
        )
        .map_err(|e| AsciiError::InvalidImage(format!("source invalide : {e}")))?;
        let mut dst_image = Image::new(width, height, PixelType::U8);

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .map_err(|e| AsciiError::InvalidImage(format!("échec du redimensionnement : {e}")))?;

        GrayImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| AsciiError::InvalidImage("buffer de sortie incohérent".into()))
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}
