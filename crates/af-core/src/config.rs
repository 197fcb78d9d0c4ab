use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Configuration complète de l'application.
///
/// Sérialisable en TOML. Chaque section et chaque champ est optionnel dans
/// le fichier ; les absents prennent leur valeur par défaut.
///
/// # Example
/// ```
/// use af_core::config::AppConfig;
/// let config = AppConfig::default();
/// assert_eq!(config.server.port, 5000);
/// assert_eq!(config.paths.input.to_str(), Some("input"));
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Conversion settings shared by batch and preview.
    pub settings: Settings,
    /// Batch directories.
    pub paths: PathsConfig,
    /// Web preview listener.
    pub server: ServerConfig,
    /// Batch policy.
    pub batch: BatchConfig,
}

/// Dossiers d'entrée et de sortie du traitement par lots.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Source frames.
    pub input: PathBuf,
    /// Destination of `.txt` artifacts.
    pub output_txt: PathBuf,
    /// Destination of `.png` artifacts.
    pub output_png: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output_txt: PathBuf::from("output-txt"),
            output_png: PathBuf::from("output-png"),
        }
    }
}

/// Adresse d'écoute de la prévisualisation web.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Politique d'erreur du traitement par lots.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Log and skip failing frames instead of aborting.
    pub keep_going: bool,
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    settings: Option<toml::Table>,
    paths: Option<PathsSection>,
    server: Option<ServerSection>,
    batch: Option<BatchSection>,
}

#[derive(Deserialize)]
struct PathsSection {
    input: Option<PathBuf>,
    output_txt: Option<PathBuf>,
    output_png: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Deserialize)]
struct BatchSection {
    keep_going: Option<bool>,
}

/// Parse TOML text and merge it over the defaults.
///
/// The `[settings]` table goes through the settings schema, so a TOML
/// value behaves exactly like the same request parameter.
///
/// # Errors
/// Returns an error if the TOML is malformed or a setting is invalid.
///
/// # Example
/// ```
/// use af_core::config::parse_config;
/// let config = parse_config("[settings]\noutput_width = 500\n[server]\nport = 8080\n").unwrap();
/// assert_eq!(config.settings.output_width, 500);
/// assert_eq!(config.server.port, 8080);
/// ```
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AppConfig::default();

    if let Some(table) = file.settings {
        let params = table.into_iter().map(|(k, v)| {
            let raw = match v {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, raw)
        });
        config.settings = Settings::default()
            .with_params(params)
            .context("Section [settings] invalide")?;
    }

    if let Some(p) = file.paths {
        if let Some(v) = p.input {
            config.paths.input = v;
        }
        if let Some(v) = p.output_txt {
            config.paths.output_txt = v;
        }
        if let Some(v) = p.output_png {
            config.paths.output_png = v;
        }
    }

    if let Some(s) = file.server {
        if let Some(v) = s.host {
            config.server.host = v;
        }
        if let Some(v) = s.port {
            config.server.port = v;
        }
    }

    if let Some(v) = file.batch.and_then(|b| b.keep_going) {
        config.batch.keep_going = v;
    }

    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use af_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("asciiframes.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Configuration invalide dans {}", path.display()))
}
