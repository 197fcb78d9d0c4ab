use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use af_core::color::Rgb;
use af_core::error::{AsciiError, Result};
use af_core::grid::AsciiGrid;
use af_core::settings::Settings;
use image::{DynamicImage, ImageFormat, RgbImage};
use rayon::prelude::*;

use crate::font::{FontChain, ResolvedFont};

/// Glyph cell dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSize {
    /// Cell width.
    pub width: u32,
    /// Cell height.
    pub height: u32,
}

/// Canvas size for `grid`: `(cell.width × longest row, cell.height × rows)`,
/// each at least 1. A grid without a single character is a 1×1 canvas.
///
/// # Example
/// ```
/// use af_core::grid::AsciiGrid;
/// use af_export::rasterizer::{CellSize, canvas_size};
/// let grid = AsciiGrid::from_text("aaaaa\nbbb\nccccccc");
/// let cell = CellSize { width: 8, height: 14 };
/// assert_eq!(canvas_size(&grid, cell), (56, 42));
/// ```
#[must_use]
pub fn canvas_size(grid: &AsciiGrid, cell: CellSize) -> (u32, u32) {
    let cols = u32::try_from(grid.max_row_len()).unwrap_or(u32::MAX);
    let rows = u32::try_from(grid.row_count()).unwrap_or(u32::MAX);
    if cols == 0 {
        return (1, 1);
    }
    (
        cell.width.saturating_mul(cols).max(1),
        cell.height.saturating_mul(rows).max(1),
    )
}

/// Convertit une grille ASCII en image RGB, une cellule de glyphe par
/// caractère.
///
/// Maintient un cache des rasters de glyphes (couverture 0..=255) pour ne
/// rasteriser chaque caractère qu'une fois par instance.
pub struct Rasterizer {
    font: ResolvedFont,
    cell: CellSize,
    fg: Rgb,
    bg: Rgb,
    /// Maps a char to its 1D coverage buffer (size = cell.width * cell.height)
    glyph_cache: HashMap<char, Vec<u8>>,
}

impl Rasterizer {
    /// Resolve the font chain for `settings` and parse its colors.
    ///
    /// # Errors
    /// Returns `InvalidSettings` if `fg_color` or `bg_color` is not a
    /// color. Font problems never fail: the chain falls back.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_chain(settings, &FontChain::for_settings(settings))
    }

    /// Same as [`Rasterizer::new`] with an explicit font chain.
    ///
    /// # Errors
    /// Returns `InvalidSettings` for an unparseable color.
    ///
    /// # Example
    /// ```
    /// use af_core::Settings;
    /// use af_export::{FontChain, Rasterizer};
    /// let settings = Settings { font_size: 16, ..Settings::default() };
    /// let mut r = Rasterizer::with_chain(&settings, &FontChain::builtin()).unwrap();
    /// let img = r.render("ab\nc").unwrap();
    /// assert_eq!(img.width(), 2 * r.cell_size().width);
    /// assert_eq!(img.height(), 2 * r.cell_size().height);
    /// ```
    pub fn with_chain(settings: &Settings, chain: &FontChain) -> Result<Self> {
        let fg = settings.fg()?;
        let bg = settings.bg()?;
        let font = chain.resolve(settings.font_size);
        let (width, height) = font.cell_size();
        log::debug!("Rasterizer : {font:?}, cellule {width}×{height}");
        Ok(Self {
            font,
            cell: CellSize { width, height },
            fg,
            bg,
            glyph_cache: HashMap::new(),
        })
    }

    /// Glyph cell measured from the reference glyph.
    #[must_use]
    pub fn cell_size(&self) -> CellSize {
        self.cell
    }

    /// Font selected by the chain.
    #[must_use]
    pub fn font(&self) -> &ResolvedFont {
        &self.font
    }

    fn cache_glyphs(&mut self, grid: &AsciiGrid) {
        let cell = (self.cell.width, self.cell.height);
        for ch in grid.rows().iter().flat_map(|r| r.chars()) {
            if ch != ' ' && !self.glyph_cache.contains_key(&ch) {
                let raster = self.font.rasterize(ch, cell);
                self.glyph_cache.insert(ch, raster);
            }
        }
    }

    /// Render newline-delimited text. Rows are drawn left-aligned at
    /// `(0, row × cell.height)`, no wrapping. Empty text → 1×1 background.
    ///
    /// # Errors
    /// Returns `InvalidText` if the text yields no rows at all.
    pub fn render(&mut self, text: &str) -> Result<RgbImage> {
        let grid = AsciiGrid::from_text(text);
        self.render_grid(&grid)
    }

    /// Render an already split grid.
    ///
    /// # Errors
    /// Returns `InvalidText` for a grid without rows.
    pub fn render_grid(&mut self, grid: &AsciiGrid) -> Result<RgbImage> {
        if grid.row_count() == 0 {
            return Err(AsciiError::InvalidText("aucune ligne".into()));
        }
        self.cache_glyphs(grid);

        let (width, height) = canvas_size(grid, self.cell);
        let stride = width as usize * 3;
        let cell_w = self.cell.width as usize;
        let cell_h = self.cell.height as usize;
        let band_size = stride * cell_h;
        let (fg, bg) = (self.fg, self.bg);
        let cache = &self.glyph_cache;
        let rows = grid.rows();

        let mut data = vec![0u8; stride * height as usize];
        for px in data.chunks_exact_mut(3) {
            px.copy_from_slice(&[bg.0, bg.1, bg.2]);
        }

        if grid.max_row_len() > 0 {
            data.par_chunks_exact_mut(band_size)
                .zip(rows.par_iter())
                .for_each(|(band, row)| {
                    for (gx, ch) in row.chars().enumerate() {
                        let Some(coverage) = cache.get(&ch) else {
                            continue;
                        };
                        let x0 = gx * cell_w;
                        for cy in 0..cell_h {
                            let line = cy * stride;
                            for cx in 0..cell_w {
                                let alpha = coverage[cy * cell_w + cx];
                                if alpha == 0 {
                                    continue;
                                }
                                let Rgb(r, g, b) = fg.over(bg, alpha);
                                let idx = line + (x0 + cx) * 3;
                                band[idx] = r;
                                band[idx + 1] = g;
                                band[idx + 2] = b;
                            }
                        }
                    }
                });
        }

        RgbImage::from_raw(width, height, data)
            .ok_or_else(|| AsciiError::InvalidText("buffer de rendu incohérent".into()))
    }

    /// Render and encode as PNG bytes.
    ///
    /// # Errors
    /// See [`Rasterizer::render`]; encoding failures map to `Io`.
    pub fn render_png(&mut self, text: &str) -> Result<Vec<u8>> {
        let img = self.render(text)?;
        encode_png(img)
    }

    /// Render and write a PNG file at `path`.
    ///
    /// # Errors
    /// See [`Rasterizer::render`]; write failures map to `Io`.
    pub fn save(&mut self, text: &str, path: &Path) -> Result<()> {
        let bytes = self.render_png(text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

fn encode_png(img: RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| AsciiError::Io(std::io::Error::other(e)))?;
    Ok(buf)
}

/// One-shot render of `text` to an in-memory bitmap.
///
/// # Errors
/// See [`Rasterizer::new`] and [`Rasterizer::render`].
pub fn ascii_to_png(text: &str, settings: &Settings) -> Result<RgbImage> {
    Rasterizer::new(settings)?.render(text)
}

/// One-shot render of `text` persisted as a PNG file.
///
/// # Errors
/// See [`Rasterizer::new`] and [`Rasterizer::save`].
pub fn save_ascii_png(text: &str, settings: &Settings, path: &Path) -> Result<()> {
    Rasterizer::new(settings)?.save(text, path)
}
