//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cli::commands::emit::EmitArgs;

#[derive(Parser, Debug)]
#[command(name = "topiclog")]
#[command(about = "Topic-routed structured logging, configured from the environment", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Overrides applied on top of the loaded settings.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Settings file (defaults to ./topiclog.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// develop, testing or product
    #[arg(short, long, global = true)]
    pub mode: Option<String>,

    /// Scope qualifier for parameter keys, e.g. APP_LOG
    #[arg(short, long, global = true)]
    pub entry: Option<String>,

    /// Separator between scope segments
    #[arg(long, global = true)]
    pub separator: Option<String>,

    /// Base directory for the rolling-file provider
    #[arg(long, global = true)]
    pub file_base: Option<PathBuf>,

    /// Log source name for the log-ingest provider
    #[arg(long, global = true)]
    pub ingest_source: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve topics from the environment and show their sink addresses
    Topics,

    /// Build the logger from the environment and emit one record
    Emit(EmitArgs),
}
