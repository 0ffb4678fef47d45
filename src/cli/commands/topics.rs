//! `topics`: show what the environment resolves to without opening sinks.

use anyhow::Result;
use serde::Serialize;
use url::Url;

use super::{build_options, load_settings};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::services::topic_resolver::{generate_address, topic_entries};

#[derive(Debug, Serialize)]
pub struct TopicLine {
    pub prefix: String,
    pub provider: String,
    pub address: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicsOutput {
    pub mode: String,
    pub entry: String,
    pub providers: Vec<String>,
    pub topics: Vec<TopicLine>,
}

impl CommandOutput for TopicsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "mode: {}, entry: {}, providers: [{}]",
            self.mode,
            if self.entry.is_empty() { "-" } else { self.entry.as_str() },
            self.providers.join(", ")
        )];
        if self.topics.is_empty() {
            lines.push("No topics configured.".to_string());
            return lines.join("\n");
        }
        for topic in &self.topics {
            let target = match (&topic.address, &topic.error) {
                (_, Some(error)) => format!("error: {error}"),
                (Some(address), None) if address.is_empty() => "(skipped)".to_string(),
                (Some(address), None) => address.clone(),
                (None, None) => "-".to_string(),
            };
            lines.push(format!("{} -> {} -> {}", topic.prefix, topic.provider, target));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: &GlobalArgs, json_mode: bool) -> Result<()> {
    let settings = load_settings(args)?;
    let options = build_options(&settings)?;

    let topics = topic_entries(&options)?
        .into_iter()
        .map(|entry| {
            let (address, error) = match generate_address(&options, &entry) {
                Ok(address) => (Some(redact_address(&address)), None),
                Err(err) => (None, Some(err.to_string())),
            };
            TopicLine {
                prefix: entry.prefix,
                provider: entry.provider,
                address,
                error,
            }
        })
        .collect();

    let result = TopicsOutput {
        mode: options.mode().to_string(),
        entry: options.entry().to_string(),
        providers: options.providers().names().into_iter().map(String::from).collect(),
        topics,
    };
    output(&result, json_mode);
    Ok(())
}

/// Mask the password part of an address.
pub fn redact_address(address: &str) -> String {
    match Url::parse(address) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_ok() {
                url.into()
            } else {
                address.to_string()
            }
        }
        _ => address.to_string(),
    }
}
