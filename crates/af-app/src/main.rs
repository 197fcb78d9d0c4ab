use std::io::Write;
use std::path::Path;

use af_core::config::AppConfig;
use anyhow::Result;
use clap::Parser;

pub mod batch;
pub mod cli;
pub mod preview;
pub mod server;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    // 3. Charger la config (CLI > fichier > défauts)
    let config = resolve_config(&cli.config)?;

    match cli.command {
        Command::Batch(args) => {
            let settings = args.settings.apply(config.settings)?;
            let input = args.input.unwrap_or(config.paths.input);
            let txt_out = args.txt_out.unwrap_or(config.paths.output_txt);
            let png_out = args.png_out.unwrap_or(config.paths.output_png);
            let keep_going = args.keep_going || config.batch.keep_going;

            log::info!("Traitement par lots de {}", input.display());
            let report = batch::run_batch(&input, &txt_out, &png_out, &settings, keep_going)?;
            if !report.failed.is_empty() {
                anyhow::bail!(
                    "{} image(s) en échec sur {}",
                    report.failed.len(),
                    report.processed + report.failed.len()
                );
            }
            Ok(())
        }
        Command::Convert(args) => {
            let settings = args.settings.apply(config.settings)?;
            let text =
                batch::convert_file(&args.image, args.txt.as_deref(), args.png.as_deref(), &settings)?;
            if args.txt.is_none() {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{text}")?;
            }
            Ok(())
        }
        Command::Serve(args) => {
            let host = args.host.unwrap_or(config.server.host);
            let port = args.port.or_else(env_port).unwrap_or(config.server.port);
            let mut state = preview::PreviewState::new(config.paths.input, config.settings);
            server::serve(&format!("{host}:{port}"), &mut state)
        }
    }
}

/// `$PORT`, when set to a valid port number.
fn env_port() -> Option<u16> {
    let raw = std::env::var("PORT").ok()?;
    match raw.trim().parse() {
        Ok(port) => Some(port),
        Err(_) => {
            log::warn!("PORT invalide ignoré : {raw}");
            None
        }
    }
}

/// Fichier absent → défauts ; fichier présent mais invalide → erreur.
fn resolve_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        af_core::config::load_config(path)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            path.display()
        );
        Ok(AppConfig::default())
    }
}
