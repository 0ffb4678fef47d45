//! CLI command implementations.

pub mod emit;
pub mod topics;

use anyhow::{Context, Result};

use crate::cli::types::GlobalArgs;
use crate::infrastructure::config::{ConfigLoader, EnvStore, Options, Settings};
use crate::infrastructure::logging::{ingest, rolling_file};

/// Settings from file and environment, with command-line overrides on top.
pub fn load_settings(args: &GlobalArgs) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    if let Some(mode) = &args.mode {
        settings.mode.clone_from(mode);
    }
    if let Some(entry) = &args.entry {
        settings.entry.clone_from(entry);
    }
    if let Some(separator) = &args.separator {
        settings.separator.clone_from(separator);
    }
    if args.file_base.is_some() {
        settings.file_base.clone_from(&args.file_base);
    }
    if args.ingest_source.is_some() {
        settings.ingest_source.clone_from(&args.ingest_source);
    }

    ConfigLoader::validate(&settings)?;
    Ok(settings)
}

/// Options backed by the process environment, with the backends enabled
/// by the settings registered.
pub fn build_options(settings: &Settings) -> Result<Options> {
    let mut options = Options::from_settings(settings)?.with_store(EnvStore);

    if let Some(base) = &settings.file_base {
        rolling_file::register(&mut options, base.clone())
            .context("Failed to register rolling-file backend")?;
    }
    if let Some(source) = &settings.ingest_source {
        ingest::register(&mut options, source.clone())
            .context("Failed to register log-ingest backend")?;
    }
    Ok(options)
}
