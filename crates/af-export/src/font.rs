use std::io::Read;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use af_core::settings::Settings;
use noto_sans_mono_bitmap::{FontWeight, RasterHeight, get_raster, get_raster_width};

/// Glyph measured to size the cells.
pub const REFERENCE_GLYPH: char = 'M';

/// Native height of the embedded bitmap font.
const BUILTIN_HEIGHT: u32 = 16;

/// Polices monospace système essayées quand `font_path` est absent ou
/// inutilisable, dans l'ordre.
#[cfg(target_os = "macos")]
pub const PLATFORM_FONTS: &[&str] = &[
    "/System/Library/Fonts/Monaco.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/System/Library/Fonts/Supplemental/Courier New.ttf",
];

/// Polices monospace système essayées quand `font_path` est absent ou
/// inutilisable, dans l'ordre.
#[cfg(target_os = "windows")]
pub const PLATFORM_FONTS: &[&str] = &["C:/Windows/Fonts/consola.ttf", "C:/Windows/Fonts/cour.ttf"];

/// Polices monospace système essayées quand `font_path` est absent ou
/// inutilisable, dans l'ordre.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const PLATFORM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansMono-Regular.ttf",
    "/usr/share/fonts/gnu-free/FreeMono.otf",
];

/// One resolution strategy of a [`FontChain`].
#[derive(Clone, Debug)]
pub enum FontSource {
    /// TrueType/OpenType file on disk.
    Path(PathBuf),
    /// Font file already in memory.
    Bytes(Vec<u8>),
    /// Embedded Noto Sans Mono bitmap font. Never fails.
    Builtin,
}

/// Chaîne de repli ordonnée : la première source chargeable gagne.
///
/// # Example
/// ```
/// use af_export::font::{FontChain, FontSource};
/// let chain = FontChain::new(vec![FontSource::Path("/nope.ttf".into())]);
/// let font = chain.resolve(12);
/// assert!(font.is_builtin());
/// ```
#[derive(Clone, Debug, Default)]
pub struct FontChain {
    sources: Vec<FontSource>,
}

impl FontChain {
    /// Chain made of exactly `sources`. [`FontChain::resolve`] still ends on
    /// the built-in font if none of them loads.
    #[must_use]
    pub fn new(sources: Vec<FontSource>) -> Self {
        Self { sources }
    }

    /// Only the embedded bitmap font. No filesystem access.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![FontSource::Builtin])
    }

    /// `font_path` (if set), then [`PLATFORM_FONTS`], then the built-in font.
    #[must_use]
    pub fn for_settings(settings: &Settings) -> Self {
        let mut sources = Vec::with_capacity(PLATFORM_FONTS.len() + 2);
        if let Some(path) = &settings.font_path {
            sources.push(FontSource::Path(path.clone()));
        }
        sources.extend(PLATFORM_FONTS.iter().map(|p| FontSource::Path(PathBuf::from(p))));
        sources.push(FontSource::Builtin);
        Self::new(sources)
    }

    /// Sources in resolution order.
    #[must_use]
    pub fn sources(&self) -> &[FontSource] {
        &self.sources
    }

    /// Try each source in order at `size_px`. Never fails.
    #[must_use]
    pub fn resolve(&self, size_px: u32) -> ResolvedFont {
        let size_px = size_px.max(1);
        for source in &self.sources {
            match source {
                FontSource::Path(path) => {
                    if let Some(font) = load_path(path) {
                        log::debug!("Police chargée : {}", path.display());
                        return ResolvedFont::outline(font, size_px, path.display().to_string());
                    }
                }
                FontSource::Bytes(data) => match FontVec::try_from_vec(data.clone()) {
                    Ok(font) => return ResolvedFont::outline(font, size_px, "<mémoire>".into()),
                    Err(e) => log::debug!("Police en mémoire invalide : {e}"),
                },
                FontSource::Builtin => return ResolvedFont::Builtin { size_px },
            }
        }
        log::warn!("Aucune police chargeable, repli sur la police bitmap intégrée");
        ResolvedFont::Builtin { size_px }
    }
}

/// Font files above this size are skipped.
const MAX_FONT_BYTES: u64 = 32 * 1024 * 1024;

fn load_path(path: &Path) -> Option<FontVec> {
    let data = match read_font_file(path, MAX_FONT_BYTES) {
        Ok(d) => d,
        Err(e) => {
            log::debug!("Police {} illisible : {e}", path.display());
            return None;
        }
    };
    match FontVec::try_from_vec(data) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("Police {} invalide : {e}", path.display());
            None
        }
    }
}

/// Lecture bornée d'un fichier régulier.
///
/// FIFO, périphériques et dossiers sont refusés avant ouverture : un `open`
/// sur une FIFO sans écrivain ne rend jamais la main.
fn read_font_file(path: &Path, limit: u64) -> std::io::Result<Vec<u8>> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "pas un fichier régulier",
        ));
    }
    if meta.len() > limit {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("fichier de {} octets, limite {limit}", meta.len()),
        ));
    }
    let mut data = Vec::new();
    std::fs::File::open(path)?.take(limit + 1).read_to_end(&mut data)?;
    if data.len() as u64 > limit {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("fichier au-delà de {limit} octets"),
        ));
    }
    Ok(data)
}

/// Font chosen by a [`FontChain`], ready to rasterize glyph cells.
pub enum ResolvedFont {
    /// Vector font, scaled to the requested pixel size.
    Outline {
        /// Parsed font.
        font: FontVec,
        /// Pixel scale.
        scale: PxScale,
        /// Where it came from, for logs.
        origin: String,
    },
    /// Embedded bitmap font, nearest-neighbour scaled.
    Builtin {
        /// Requested cell height in pixels.
        size_px: u32,
    },
}

impl std::fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline { origin, scale, .. } => {
                write!(f, "Outline({origin}, {}px)", scale.y)
            }
            Self::Builtin { size_px } => write!(f, "Builtin({size_px}px)"),
        }
    }
}

impl ResolvedFont {
    fn outline(font: FontVec, size_px: u32, origin: String) -> Self {
        Self::Outline {
            font,
            scale: PxScale::from(size_px as f32),
            origin,
        }
    }

    /// Whether the embedded fallback was selected.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }

    /// Glyph cell `(width, height)` in pixels, each at least 1.
    ///
    /// Outline fonts: advance of [`REFERENCE_GLYPH`] × (ascent − descent).
    #[must_use]
    pub fn cell_size(&self) -> (u32, u32) {
        let (w, h) = match self {
            Self::Outline { font, scale, .. } => {
                let scaled = font.as_scaled(*scale);
                let w = scaled.h_advance(font.glyph_id(REFERENCE_GLYPH)).ceil();
                let h = (scaled.ascent() - scaled.descent()).ceil();
                (w.max(0.0) as u32, h.max(0.0) as u32)
            }
            Self::Builtin { size_px } => {
                let native_w = get_raster_width(FontWeight::Regular, RasterHeight::Size16) as u32;
                let w = (f64::from(native_w) * f64::from(*size_px) / f64::from(BUILTIN_HEIGHT)).round();
                (w as u32, *size_px)
            }
        };
        (w.max(1), h.max(1))
    }

    /// Coverage raster (`0..=255`, row-major, `cell.0 × cell.1`) of `ch`
    /// drawn at the top-left of a cell, baseline at the ascent.
    #[must_use]
    pub fn rasterize(&self, ch: char, cell: (u32, u32)) -> Vec<u8> {
        let (cw, chh) = cell;
        let mut buffer = vec![0u8; cw as usize * chh as usize];
        match self {
            Self::Outline { font, scale, .. } => {
                let ascent = font.as_scaled(*scale).ascent();
                let glyph = font
                    .glyph_id(ch)
                    .with_scale_and_position(*scale, point(0.0, ascent));
                if let Some(outline) = font.outline_glyph(glyph) {
                    let bounds = outline.px_bounds();
                    outline.draw(|x, y, v| {
                        let px = x as i32 + bounds.min.x as i32;
                        let py = y as i32 + bounds.min.y as i32;
                        if px >= 0 && py >= 0 && (px as u32) < cw && (py as u32) < chh {
                            let idx = py as usize * cw as usize + px as usize;
                            let a = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                            buffer[idx] = buffer[idx].max(a);
                        }
                    });
                }
            }
            Self::Builtin { .. } => {
                let Some(raster) = get_raster(ch, FontWeight::Regular, RasterHeight::Size16)
                    .or_else(|| get_raster('?', FontWeight::Regular, RasterHeight::Size16))
                else {
                    return buffer;
                };
                let rows = raster.raster();
                let (rw, rh) = (raster.width() as u32, raster.height() as u32);
                for y in 0..chh {
                    let sy = (y * rh / chh) as usize;
                    for x in 0..cw {
                        let sx = (x * rw / cw) as usize;
                        if let Some(&v) = rows.get(sy).and_then(|row| row.get(sx)) {
                            buffer[y as usize * cw as usize + x as usize] = v;
                        }
                    }
                }
            }
        }
        buffer
    }
}
