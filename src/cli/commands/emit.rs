//! `emit`: build the logger and write one record through it.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::Level;

use super::{build_options, load_settings};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::services::logger;

#[derive(Args, Debug)]
pub struct EmitArgs {
    /// trace, debug, info, warn or error
    #[arg(short, long, default_value = "info")]
    pub level: String,

    /// Logger name, used as the ingestion topic
    #[arg(short, long)]
    pub name: Option<String>,

    /// Context pairs attached to the record
    #[arg(short = 'C', long = "context", value_name = "KEY=VALUE", value_parser = parse_pair)]
    pub context: Vec<(String, String)>,

    /// Record message
    pub message: String,
}

fn parse_pair(text: &str) -> Result<(String, String), String> {
    text.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{text}`"))
}

#[derive(Debug, Serialize)]
pub struct EmitOutput {
    pub level: String,
    pub logger: Option<String>,
    pub closed_sinks: usize,
}

impl CommandOutput for EmitOutput {
    fn to_human(&self) -> String {
        format!(
            "Emitted {} record{}; closed {} sink hook(s)",
            self.level,
            self.logger
                .as_ref()
                .map(|name| format!(" as `{name}`"))
                .unwrap_or_default(),
            self.closed_sinks
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(global: &GlobalArgs, args: EmitArgs, json_mode: bool) -> Result<()> {
    let level: Level = args
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid level: {}. Must be one of: trace, debug, info, warn, error", args.level))?;

    let settings = load_settings(global)?;
    let options = build_options(&settings)?;
    let (mut log, shutdown) = logger::new(options).context("Failed to build logger")?;

    if let Some(name) = &args.name {
        log = log.named(name);
    }
    for (key, value) in &args.context {
        log = log.with(key.as_str(), value);
    }
    log.log(level, &args.message);

    let result = EmitOutput {
        level: level.as_str().to_ascii_lowercase(),
        logger: args.name,
        closed_sinks: shutdown.len(),
    };
    shutdown.run();
    output(&result, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("user=42").unwrap(),
            ("user".to_string(), "42".to_string())
        );
        assert_eq!(
            parse_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }
}
