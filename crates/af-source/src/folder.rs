use std::fs;
use std::path::{Path, PathBuf};

use af_core::error::{AsciiError, Result};

/// Extensions image reconnues (comparaison insensible à la casse).
pub const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "gif"];

/// Whether `path` carries a supported image extension.
///
/// # Example
/// ```
/// use af_source::folder::is_supported;
/// use std::path::Path;
/// assert!(is_supported(Path::new("frame_0001.PNG")));
/// assert!(!is_supported(Path::new("notes.txt")));
/// ```
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| IMAGE_EXTS.contains(&ext.to_lowercase().as_str()))
}

/// Liste les images d'un dossier, non récursif, triées par nom de fichier.
///
/// # Errors
/// `NotFound` if `dir` is not a directory, `Io` if it cannot be read.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AsciiError::NotFound {
            path: dir.display().to_string(),
        });
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::debug!("{} image(s) trouvée(s) dans {}", files.len(), dir.display());
    Ok(files)
}

/// File names (no directory part) of [`list_images`].
///
/// # Errors
/// Same as [`list_images`].
pub fn list_image_names(dir: &Path) -> Result<Vec<String>> {
    Ok(list_images(dir)?
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
        .collect())
}

/// Resolve a plain file name inside `dir`.
///
/// Names with a directory component (`..`, separators) are refused so a
/// request can only reach entries that [`list_images`] would show.
///
/// # Errors
/// `NotFound` if the name is not a plain file name or no such file exists.
///
/// # Example
/// ```
/// use af_source::folder::resolve_entry;
/// use std::path::Path;
/// assert!(resolve_entry(Path::new("input"), "../secret.png").is_err());
/// ```
pub fn resolve_entry(dir: &Path, name: &str) -> Result<PathBuf> {
    let not_found = || AsciiError::NotFound {
        path: name.to_string(),
    };
    let candidate = Path::new(name);
    if name.is_empty() || candidate.file_name().and_then(|n| n.to_str()) != Some(name) {
        return Err(not_found());
    }
    let path = dir.join(candidate);
    if path.is_file() { Ok(path) } else { Err(not_found()) }
}
