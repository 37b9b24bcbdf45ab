//! Main module for the facefind CLI application.
//!
//! This module provides the main function for the CLI. It handles command parsing,
//! configuration loading and initialization, and dispatches to the library for the
//! offline index build and for queries.
//!
//! # Examples
//!
//! Building an index from precomputed embeddings, then querying it:
//!
//! ```sh
//! facefind build ./embeddings --dimension 512
//! facefind query ./probe.json -k 5 --distances
//! ```
//!
//! Initializing the application's configuration:
//!
//! ```sh
//! facefind init
//! ```

use clap::Parser;
use facefind::builder::{IndexBuilder, read_embedding_file};
use facefind::commands::{Cli, Commands};
use facefind::config::{self, FaceFindConfig};
use facefind::handle::IndexHandle;
use facefind::persist;
use facefind::query::QueryService;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::OnceCell;
use std::{env, error::Error, fs, path::Path};
use tracing::{debug, info, warn};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    });
    run()
}

/// Parses command-line arguments, loads configuration, and executes the command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, or if the selected command
/// fails (unreadable input directory, missing or inconsistent index artifacts, ...).
fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => facefind::config_dir()?.join("config.yaml"),
    };

    let load_settings = || -> Result<FaceFindConfig, Box<dyn Error>> {
        let settings = load_or_default(&config_path)?;
        debug!("Config loaded: {:?}", settings);
        Ok(settings)
    };

    match cli.command {
        Commands::Init => {
            debug!("Initializing configuration");
            init(&config_path)?;
        }
        Commands::Build {
            input_dir,
            index,
            identifiers,
            dimension,
        } => {
            let settings = load_settings()?;
            let index_path = index.unwrap_or_else(|| settings.index_path.clone());
            let identifiers_path = identifiers.unwrap_or_else(|| settings.identifiers_path.clone());

            let builder = match dimension.or(settings.dimension) {
                Some(d) => IndexBuilder::with_dimension(d),
                None => IndexBuilder::new(),
            };
            let (store, report) = builder
                .with_progress(progress_bar())
                .from_embeddings_dir(&input_dir)?;

            for skipped in &report.skipped {
                eprintln!("skipped {}: {}", skipped.identifier, skipped.reason);
            }
            persist::save(&store, &index_path, &identifiers_path)?;
            println!(
                "indexed {} faces ({} skipped) into {}",
                report.inserted,
                report.skipped.len(),
                index_path.display()
            );
        }
        Commands::Query {
            embedding,
            k,
            distances,
        } => {
            let settings = load_settings()?;
            let Some(query) = read_embedding_file(&embedding)? else {
                info!("No face recorded in {}", embedding.display());
                return Ok(());
            };
            let service = QueryService::new(IndexHandle::open(&settings)?).with_default_k(settings.default_k);
            let k = k.unwrap_or(settings.default_k);

            if distances {
                for m in service.query_with_distances(&query, k)? {
                    println!("{}\t{}", m.identifier, m.distance);
                }
            } else {
                for identifier in service.query(&query, k)? {
                    println!("{}", identifier);
                }
            }
        }
        Commands::Inspect { slot } => {
            let settings = load_settings()?;
            let handle = IndexHandle::open(&settings)?;
            match slot {
                Some(slot) => {
                    let record = handle.store().get(slot)?;
                    println!("{}", serde_json::to_string_pretty(record)?);
                }
                None => {
                    let manifest = persist::read_manifest(&settings.index_path)?;
                    println!("faces:     {}", handle.len());
                    println!("dimension: {}", handle.dimension().unwrap_or(0));
                    println!("built at:  {}", manifest.built_at);
                    println!("checksum:  {}", manifest.checksum);
                }
            }
        }
    }

    Ok(())
}

/// Loads the config at `path`, falling back to artifacts in the working directory.
fn load_or_default(path: &Path) -> Result<FaceFindConfig, Box<dyn Error>> {
    if path.exists() {
        return config::load_config(path.to_str().ok_or("config path is not valid UTF-8")?);
    }
    warn!(
        "No config at {}, using artifacts in the current directory",
        path.display()
    );
    Ok(FaceFindConfig::in_dir(env::current_dir()?))
}

fn progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(0).with_style(style)
}

/// Writes a default configuration file pointing at artifacts under the config directory.
///
/// An existing config file is left untouched.
///
/// # Errors
///
/// Returns an error if there is an issue creating the directory or file, or
/// serializing the configuration to YAML.
fn init(config_path: &Path) -> Result<(), Box<dyn Error>> {
    if config_path.exists() {
        info!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or(env::current_dir()?);
    info!("Creating config directory: {}", dir.display());
    fs::create_dir_all(&dir)?;

    let config = FaceFindConfig::in_dir(&dir);
    info!("Creating config file: {}", config_path.display());
    fs::write(config_path, serde_yaml::to_string(&config)?)?;
    println!("wrote {}", config_path.display());

    Ok(())
}
