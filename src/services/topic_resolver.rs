//! Topic resolution.
//!
//! Topics come from two additive sources in the parameter store:
//! - multi-topic: `Entries` lists prefixes, each with a scoped `Provider`
//! - single-topic: `Enable` switches on one topic named after `Provider`
//!
//! Each resolved topic is turned into an address by its provider and then
//! opened through the sink registry.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::errors::LogError;
use crate::domain::models::{title_case, word_means_true, TopicEntry, CONFIG_ENABLE, CONFIG_ENTRIES, CONFIG_PROVIDER};
use crate::domain::ports::{ParamStore, ScopedParams};
use crate::infrastructure::config::Options;
use crate::infrastructure::logging::OpenedSink;

/// Resolve the prefix to provider map. No store means no topics.
pub fn resolve_topics(options: &Options) -> Result<BTreeMap<String, String>, LogError> {
    let mut topics = BTreeMap::new();
    let Some(store) = options.store() else {
        return Ok(topics);
    };
    let root = scoped(options, store, "");

    if let Some(entries) = root.get(CONFIG_ENTRIES).filter(|value| !value.is_empty()) {
        for prefix in entries.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let params = scoped(options, store, prefix);
            let provider = params
                .get(CONFIG_PROVIDER)
                .ok_or_else(|| LogError::MissingParam {
                    key: params.scoped_key(CONFIG_PROVIDER),
                })?;
            insert_topic(&mut topics, prefix.to_string(), provider.trim().to_string());
        }
    }

    if root.get(CONFIG_ENABLE).is_some_and(|value| word_means_true(&value)) {
        let provider = root
            .get(CONFIG_PROVIDER)
            .ok_or_else(|| LogError::MissingParam {
                key: root.scoped_key(CONFIG_PROVIDER),
            })?;
        let provider = provider.trim().to_string();
        insert_topic(&mut topics, title_case(&provider), provider);
    }

    Ok(topics)
}

fn scoped<'a>(options: &'a Options, store: &'a dyn ParamStore, prefix: &'a str) -> ScopedParams<'a> {
    ScopedParams::new(store, options.separator(), options.entry(), prefix)
}

fn insert_topic(topics: &mut BTreeMap<String, String>, prefix: String, provider: String) {
    if let Some(previous) = topics.get(&prefix) {
        warn!(
            prefix = %prefix,
            previous = %previous,
            provider = %provider,
            "topic prefix defined twice, keeping the last definition"
        );
    }
    topics.insert(prefix, provider);
}

/// Resolved topics as entries, in opening order.
pub fn topic_entries(options: &Options) -> Result<Vec<TopicEntry>, LogError> {
    Ok(resolve_topics(options)?
        .into_iter()
        .map(|(prefix, provider)| TopicEntry::new(prefix, provider))
        .collect())
}

/// Ask the topic's provider for its sink address.
pub fn generate_address(options: &Options, entry: &TopicEntry) -> Result<String, LogError> {
    let provider = options.providers().lookup(&entry.provider)?;
    let empty = BTreeMap::<String, String>::new();
    let store: &dyn ParamStore = options.store().unwrap_or(&empty);
    let params = scoped(options, store, &entry.prefix);

    provider
        .generate(&params)
        .map_err(|source| LogError::Generate {
            prefix: entry.prefix.clone(),
            provider: entry.provider.clone(),
            source,
        })
}

/// Generate and open one topic. An empty address skips the topic.
pub fn open_topic(options: &Options, entry: &TopicEntry) -> Result<Option<OpenedSink>, LogError> {
    let address = generate_address(options, entry)?;
    if address.is_empty() {
        debug!(prefix = %entry.prefix, provider = %entry.provider, "empty sink address, topic skipped");
        return Ok(None);
    }

    options
        .sinks()
        .open(&address)
        .map(Some)
        .map_err(|source| LogError::Open {
            prefix: entry.prefix.clone(),
            provider: entry.provider.clone(),
            source,
        })
}

/// Resolve and open every topic. On failure the sinks opened so far are
/// closed before the error is returned.
pub fn open_topics(options: &Options) -> Result<Vec<(TopicEntry, OpenedSink)>, LogError> {
    let mut opened: Vec<(TopicEntry, OpenedSink)> = Vec::new();
    for entry in topic_entries(options)? {
        match open_topic(options, &entry) {
            Ok(Some(sink)) => opened.push((entry, sink)),
            Ok(None) => {}
            Err(err) => {
                for (_, sink) in opened {
                    sink.close();
                }
                return Err(err);
            }
        }
    }
    Ok(opened)
}
