use std::path::Path;

use af_core::error::{AsciiError, Result};
use image::DynamicImage;

/// Charge une image depuis le disque.
///
/// # Errors
/// `NotFound` if `path` is not a file, `InvalidImage` if it cannot be
/// decoded or has a zero dimension.
///
/// # Example
/// ```no_run
/// use af_source::image::load_image;
/// use std::path::Path;
/// let img = load_image(Path::new("input/0001.png")).unwrap();
/// ```
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(AsciiError::NotFound {
            path: path.display().to_string(),
        });
    }
    let img = image::open(path)
        .map_err(|e| AsciiError::InvalidImage(format!("{}: {e}", path.display())))?;
    check_dimensions(img)
}

/// Décode une image depuis un buffer mémoire (upload HTTP).
///
/// # Errors
/// `InvalidImage` if the bytes are empty, undecodable, or decode to a
/// zero-sized image.
///
/// # Example
/// ```
/// use af_source::image::decode_image;
/// assert!(decode_image(b"definitely not a png").is_err());
/// ```
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(AsciiError::InvalidImage("buffer vide".into()));
    }
    let img = image::load_from_memory(bytes).map_err(|e| AsciiError::InvalidImage(e.to_string()))?;
    check_dimensions(img)
}

fn check_dimensions(img: DynamicImage) -> Result<DynamicImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(AsciiError::InvalidImage(format!(
            "dimensions nulles {}×{}",
            img.width(),
            img.height()
        )));
    }
    Ok(img)
}
