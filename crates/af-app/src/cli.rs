use std::path::PathBuf;

use af_core::Settings;
use clap::{Args, Parser, Subcommand};

/// asciiframes : convertit des images en art ASCII (texte + PNG).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : asciiframes.toml.
    #[arg(short, long, default_value = "asciiframes.toml", global = true)]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convertit chaque image d'un dossier en `.txt` + `.png`.
    Batch(BatchArgs),
    /// Convertit une seule image.
    Convert(ConvertArgs),
    /// Lance la prévisualisation web interactive.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Dossier des images sources (défaut : `paths.input`).
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Dossier de sortie des `.txt` (défaut : `paths.output_txt`).
    #[arg(long)]
    pub txt_out: Option<PathBuf>,

    /// Dossier de sortie des `.png` (défaut : `paths.output_png`).
    #[arg(long)]
    pub png_out: Option<PathBuf>,

    /// Continuer après une image en échec au lieu d'abandonner le lot.
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image source.
    pub image: PathBuf,

    /// Fichier texte de sortie. Absent : la grille est écrite sur stdout.
    #[arg(long)]
    pub txt: Option<PathBuf>,

    /// Fichier PNG de sortie.
    #[arg(long)]
    pub png: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Adresse d'écoute (défaut : `server.host`).
    #[arg(long)]
    pub host: Option<String>,

    /// Port d'écoute (défaut : `$PORT`, puis `server.port`).
    #[arg(long)]
    pub port: Option<u16>,
}

/// Overrides de réglages partagés par `batch` et `convert`.
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Nombre de colonnes.
    #[arg(long)]
    pub width: Option<u32>,

    /// Rampe de caractères, du plus sombre au plus clair.
    #[arg(long, allow_hyphen_values = true)]
    pub chars: Option<String>,

    /// Seuil de noir (-1 désactive).
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<i32>,

    /// Inverser la luminance (`--invert=false` annule la config).
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub invert: Option<bool>,

    /// Rapport largeur/hauteur d'une cellule de glyphe.
    #[arg(long)]
    pub aspect: Option<f32>,

    /// Police TrueType/OpenType préférée.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Taille de police en pixels.
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Couleur des glyphes.
    #[arg(long)]
    pub fg: Option<String>,

    /// Couleur de fond.
    #[arg(long)]
    pub bg: Option<String>,
}

impl SettingsArgs {
    /// Overrides as `(field, value)` pairs named after the settings schema.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(v) = self.width {
            params.push(("output_width", v.to_string()));
        }
        if let Some(v) = &self.chars {
            params.push(("ascii_chars", v.clone()));
        }
        if let Some(v) = self.threshold {
            params.push(("black_threshold", v.to_string()));
        }
        if let Some(v) = self.invert {
            params.push(("invert", v.to_string()));
        }
        if let Some(v) = self.aspect {
            params.push(("char_aspect", v.to_string()));
        }
        if let Some(v) = &self.font {
            params.push(("font_path", v.display().to_string()));
        }
        if let Some(v) = self.font_size {
            params.push(("font_size", v.to_string()));
        }
        if let Some(v) = &self.fg {
            params.push(("fg_color", v.clone()));
        }
        if let Some(v) = &self.bg {
            params.push(("bg_color", v.clone()));
        }
        params
    }

    /// Layer the overrides over `base` (usually the config file settings).
    ///
    /// # Errors
    /// Returns `InvalidSettings` if an override breaks an invariant.
    pub fn apply(&self, base: Settings) -> af_core::Result<Settings> {
        base.with_params(self.params())
    }
}
