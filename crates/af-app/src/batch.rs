use std::fs;
use std::path::{Path, PathBuf};

use af_ascii::Quantizer;
use af_core::Settings;
use af_export::Rasterizer;
use af_source::folder::list_images;
use af_source::image::load_image;
use anyhow::{Context, Result};

/// Bilan d'un traitement par lots.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Frames converted to both artifacts.
    pub processed: usize,
    /// Frames skipped under `keep_going`, with the failure message.
    pub failed: Vec<(PathBuf, String)>,
}

/// Convertit chaque image de `input` en `<stem>.txt` dans `txt_dir` et
/// `<stem>.png` dans `png_dir`, par ordre lexicographique de nom.
///
/// Les dossiers de sortie sont créés au besoin et les fichiers existants
/// écrasés.
///
/// # Errors
/// Invalid settings, an unreadable input folder or an output folder that
/// cannot be created abort the run. Without `keep_going`, the first failing
/// frame aborts it too.
pub fn run_batch(
    input: &Path,
    txt_dir: &Path,
    png_dir: &Path,
    settings: &Settings,
    keep_going: bool,
) -> Result<BatchReport> {
    settings.validate()?;
    let frames = list_images(input)
        .with_context(|| format!("Impossible de lister {}", input.display()))?;
    for dir in [txt_dir, png_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Impossible de créer {}", dir.display()))?;
    }
    if frames.is_empty() {
        log::warn!("Aucune image dans {}", input.display());
    }

    let mut quantizer = Quantizer::new();
    let mut rasterizer = Rasterizer::new(settings)?;
    let mut report = BatchReport::default();

    for frame in frames {
        match convert_frame(&frame, txt_dir, png_dir, settings, &mut quantizer, &mut rasterizer) {
            Ok((txt, png)) => {
                log::info!(
                    "Processed {} -> {}, {}",
                    file_label(&frame),
                    txt.display(),
                    png.display()
                );
                report.processed += 1;
            }
            Err(e) if keep_going => {
                log::error!("Échec sur {} : {e:#}", frame.display());
                report.failed.push((frame, format!("{e:#}")));
            }
            Err(e) => {
                return Err(e.context(format!("Échec du traitement de {}", frame.display())));
            }
        }
    }

    log::info!(
        "Lot terminé : {} image(s) traitée(s), {} échec(s)",
        report.processed,
        report.failed.len()
    );
    Ok(report)
}

fn convert_frame(
    frame: &Path,
    txt_dir: &Path,
    png_dir: &Path,
    settings: &Settings,
    quantizer: &mut Quantizer,
    rasterizer: &mut Rasterizer,
) -> Result<(PathBuf, PathBuf)> {
    let stem = frame
        .file_stem()
        .with_context(|| format!("Nom de fichier invalide : {}", frame.display()))?;
    let stem = stem.to_string_lossy();
    let txt_path = txt_dir.join(format!("{stem}.txt"));
    let png_path = png_dir.join(format!("{stem}.png"));

    let image = load_image(frame)?;
    let text = quantizer.quantize(&image, settings)?.to_text();
    fs::write(&txt_path, &text)
        .with_context(|| format!("Impossible d'écrire {}", txt_path.display()))?;
    rasterizer
        .save(&text, &png_path)
        .with_context(|| format!("Impossible d'écrire {}", png_path.display()))?;
    Ok((txt_path, png_path))
}

/// Conversion d'une seule image. Renvoie le texte ASCII ; écrit les
/// artefacts demandés.
///
/// # Errors
/// Returns an error if the image cannot be loaded or converted, or if an
/// artifact cannot be written.
pub fn convert_file(
    image: &Path,
    txt: Option<&Path>,
    png: Option<&Path>,
    settings: &Settings,
) -> Result<String> {
    let source = load_image(image)?;
    let text = Quantizer::new().quantize(&source, settings)?.to_text();
    if let Some(path) = txt {
        fs::write(path, &text).with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        log::info!("Texte écrit : {}", path.display());
    }
    if let Some(path) = png {
        Rasterizer::new(settings)?
            .save(&text, path)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        log::info!("PNG écrit : {}", path.display());
    }
    Ok(text)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn small_settings() -> Settings {
        Settings {
            output_width: 8,
            char_aspect: 1.0,
            font_size: 10,
            ..Settings::default()
        }
    }

    fn write_gray(dir: &Path, name: &str, v: u8) {
        GrayImage::from_pixel(16, 8, Luma([v]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn converts_every_frame_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("input");
        fs::create_dir(&input).unwrap();
        write_gray(&input, "0002.png", 200);
        write_gray(&input, "0001.png", 90);
        write_gray(&input, "0003.final.png", 30);
        fs::write(input.join("notes.txt"), "pas une image").unwrap();

        let txt_dir = root.path().join("out/txt");
        let png_dir = root.path().join("out/png");
        let settings = small_settings();
        let report = run_batch(&input, &txt_dir, &png_dir, &settings, false).unwrap();
        assert_eq!(report.processed, 3);
        assert!(report.failed.is_empty());

        let text = fs::read_to_string(txt_dir.join("0001.txt")).unwrap();
        let expected =
            af_ascii::image_to_ascii(&load_image(&input.join("0001.png")).unwrap(), &settings)
                .unwrap();
        assert_eq!(text, expected);
        assert_eq!(text.lines().count(), 4);

        let png = image::open(png_dir.join("0002.png")).unwrap();
        let cell = Rasterizer::new(&settings).unwrap().cell_size();
        assert_eq!(png.width(), 8 * cell.width);
        assert!(!txt_dir.join("notes.txt").exists());
        assert!(txt_dir.join("0003.final.txt").exists());
    }

    #[test]
    fn existing_artifacts_are_overwritten() {
        let root = tempfile::tempdir().unwrap();
        write_gray(root.path(), "a.png", 100);
        let out = root.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("a.txt"), "ancien contenu").unwrap();

        run_batch(root.path(), &out, &out, &small_settings(), false).unwrap();
        assert_ne!(fs::read_to_string(out.join("a.txt")).unwrap(), "ancien contenu");
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        let report = run_batch(root.path(), &out, &out, &small_settings(), false).unwrap();
        assert_eq!(report.processed, 0);
        assert!(out.is_dir());
    }

    #[test]
    fn missing_input_folder_fails() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        assert!(run_batch(&root.path().join("absent"), &out, &out, &small_settings(), false).is_err());
    }

    #[test]
    fn corrupt_frame_fails_fast_or_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("input");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a_broken.png"), b"not a png").unwrap();
        write_gray(&input, "b_ok.png", 120);
        let out = root.path().join("out");

        assert!(run_batch(&input, &out, &out, &small_settings(), false).is_err());
        assert!(!out.join("b_ok.txt").exists());

        let report = run_batch(&input, &out, &out, &small_settings(), true).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("a_broken.png"));
        assert!(out.join("b_ok.txt").exists());
    }

    #[test]
    fn invalid_settings_abort_before_any_output() {
        let root = tempfile::tempdir().unwrap();
        write_gray(root.path(), "a.png", 100);
        let out = root.path().join("out");
        let settings = Settings {
            bg_color: "pas-une-couleur".into(),
            ..small_settings()
        };
        assert!(run_batch(root.path(), &out, &out, &settings, true).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn single_file_conversion() {
        let root = tempfile::tempdir().unwrap();
        write_gray(root.path(), "one.png", 60);
        let txt = root.path().join("one.txt");
        let png = root.path().join("one.png.out.png");
        let text =
            convert_file(&root.path().join("one.png"), Some(&txt), Some(&png), &small_settings())
                .unwrap();
        assert_eq!(fs::read_to_string(&txt).unwrap(), text);
        assert!(image::open(&png).is_ok());

        let stdout_only = convert_file(&root.path().join("one.png"), None, None, &small_settings())
            .unwrap();
        assert_eq!(stdout_only, text);
    }
}
