//! Remote log-ingestion backend: provider, sink opener and hijacking layer.
//!
//! Address format:
//! `log-ingest://<ak>:<sk>@<host>?schema=<http|https>&source=..&project=..&logStore=..`
//!
//! The opened sink replaces the generic encoder: every event is flattened
//! into a string map and queued on a [`BatchSender`]. The `logger` field
//! of an event selects the ingestion topic; the pairs of its `context`
//! field become top-level keys.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;
use url::Url;

use super::batch_sender::{BatchConfig, BatchSender, IngestRecord, DEFAULT_LINGER, DEFAULT_MAX_BATCH};
use super::sink_registry::OpenedSink;
use crate::domain::errors::{LogError, ProviderError, SinkError};
use crate::domain::ports::{ScopedParams, TopicProvider};
use crate::infrastructure::config::Options;

pub const SCHEME: &str = "log-ingest";

/// Topic used when an event carries no logger name.
pub const DEFAULT_TOPIC: &str = "none";

/// Field carrying the logger's context pairs as a JSON object.
const CONTEXT_FIELD: &str = "context";

const PARAM_SCHEMA: &str = "schema";
const PARAM_SOURCE: &str = "source";
const PARAM_PROJECT: &str = "project";
const PARAM_LOG_STORE: &str = "logStore";
const PARAM_MAX_BATCH: &str = "maxBatch";
const PARAM_LINGER_MS: &str = "lingerMs";

const CONFIG_ENDPOINT: &str = "Endpoint";
const CONFIG_ACCESS_KEY_ID: &str = "AccessKeyID";
const CONFIG_ACCESS_KEY_SECRET: &str = "AccessKeySecret";
const CONFIG_PROJECT: &str = "Project";
const CONFIG_LOG_STORE: &str = "LogStore";
const CONFIG_MAX_BATCH: &str = "MaxBatch";
const CONFIG_LINGER_MS: &str = "LingerMs";

/// Generates `log-ingest` addresses for one log source.
#[derive(Debug, Clone)]
pub struct IngestProvider {
    name: Option<String>,
    source: String,
}

impl IngestProvider {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            name: None,
            source: source.into(),
        }
    }

    /// Register the same backend under another provider name.
    #[must_use]
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            source: self.source.clone(),
        }
    }
}

impl TopicProvider for IngestProvider {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(SCHEME)
    }

    fn generate(&self, params: &ScopedParams<'_>) -> Result<String, ProviderError> {
        let (schema, host) = parse_endpoint(&params.require(CONFIG_ENDPOINT)?)?;
        if self.source.is_empty() {
            return Err(ProviderError::Unconfigured {
                provider: self.name().to_string(),
                reason: "unspecified log source".to_string(),
            });
        }
        let access_key_id = params.require(CONFIG_ACCESS_KEY_ID)?;
        let access_key_secret = params.require(CONFIG_ACCESS_KEY_SECRET)?;
        let project = params.require(CONFIG_PROJECT)?;
        let log_store = params.require(CONFIG_LOG_STORE)?;

        let invalid_endpoint = |reason: String| ProviderError::InvalidParam {
            key: params.scoped_key(CONFIG_ENDPOINT),
            reason,
        };
        let mut address =
            Url::parse(&format!("{SCHEME}://{host}")).map_err(|e| invalid_endpoint(e.to_string()))?;
        if address.set_username(&access_key_id).is_err()
            || address.set_password(Some(&access_key_secret)).is_err()
        {
            return Err(invalid_endpoint(format!("`{host}` cannot carry credentials")));
        }
        {
            let mut query = address.query_pairs_mut();
            query.append_pair(PARAM_SCHEMA, &schema);
            query.append_pair(PARAM_SOURCE, &self.source);
            query.append_pair(PARAM_PROJECT, &project);
            query.append_pair(PARAM_LOG_STORE, &log_store);
            for (config, param) in [
                (CONFIG_MAX_BATCH, PARAM_MAX_BATCH),
                (CONFIG_LINGER_MS, PARAM_LINGER_MS),
            ] {
                if let Some(value) = params.get(config) {
                    query.append_pair(param, &value);
                }
            }
        }
        Ok(address.into())
    }
}

/// Split an endpoint into `(scheme, host[:port])`. Bare hosts are `http`.
pub fn parse_endpoint(endpoint: &str) -> Result<(String, String), ProviderError> {
    let endpoint = endpoint.trim();
    let invalid = |reason: String| ProviderError::InvalidParam {
        key: CONFIG_ENDPOINT.to_string(),
        reason,
    };
    if !endpoint.contains("://") {
        if endpoint.is_empty() {
            return Err(invalid("empty endpoint".to_string()));
        }
        return Ok(("http".to_string(), endpoint.trim_end_matches('/').to_string()));
    }

    let url = Url::parse(endpoint).map_err(|e| invalid(format!("cant parse `{endpoint}`: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid(format!("`{endpoint}` has no host")))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok((url.scheme().to_string(), host))
}

/// Register the provider and the `log-ingest` opener on `options`.
pub fn register(options: &mut Options, source: impl Into<String>) -> Result<(), LogError> {
    options.register_provider(IngestProvider::new(source))?;
    options.register_sink(SCHEME, open)
}

/// Connection parameters decoded from a `log-ingest` address.
pub fn batch_config(address: &Url) -> Result<BatchConfig, SinkError> {
    let query: BTreeMap<String, String> = address.query_pairs().into_owned().collect();
    let required = |name: &str| {
        query
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| SinkError::MissingArg(name.to_string()))
    };

    let host = address
        .host_str()
        .ok_or_else(|| SinkError::MissingArg("host".to_string()))?;
    let schema = query
        .get(PARAM_SCHEMA)
        .filter(|value| !value.is_empty())
        .map_or("http", String::as_str);
    let endpoint_text = match address.port() {
        Some(port) => format!("{schema}://{host}:{port}"),
        None => format!("{schema}://{host}"),
    };
    let endpoint = Url::parse(&endpoint_text).map_err(|e| SinkError::InvalidArg {
        arg: PARAM_SCHEMA.to_string(),
        reason: format!("`{endpoint_text}`: {e}"),
    })?;

    let mut config = BatchConfig::new(endpoint, required(PARAM_PROJECT)?, required(PARAM_LOG_STORE)?);
    config.source = query.get(PARAM_SOURCE).cloned().unwrap_or_default();
    config.access_key_id = decode(address.username());
    config.access_key_secret = decode(address.password().unwrap_or_default());
    config.max_batch = parse_arg(&query, PARAM_MAX_BATCH)?.unwrap_or(DEFAULT_MAX_BATCH);
    config.linger = parse_arg(&query, PARAM_LINGER_MS)?.map_or(DEFAULT_LINGER, Duration::from_millis);
    Ok(config)
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn parse_arg<T>(query: &BTreeMap<String, String>, name: &str) -> Result<Option<T>, SinkError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    query
        .get(name)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| SinkError::InvalidArg {
                arg: name.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Open a `log-ingest` address: start a sender and hijack the topic core.
pub fn open(address: &Url) -> Result<OpenedSink, SinkError> {
    let sender = Arc::new(BatchSender::start(batch_config(address)?)?);
    let layer = IngestLayer::new(Arc::clone(&sender));
    Ok(OpenedSink::hijack(Box::new(layer)).with_closer(move || {
        sender.close();
        Ok(())
    }))
}

/// Layer that ships every event through a [`BatchSender`].
#[derive(Debug, Clone)]
pub struct IngestLayer {
    sender: Arc<BatchSender>,
}

impl IngestLayer {
    pub fn new(sender: Arc<BatchSender>) -> Self {
        Self { sender }
    }
}

impl<S: Subscriber> Layer<S> for IngestLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let (topic, record) = flatten_event(event);
        self.sender.send(topic, record);
    }
}

/// Turn an event into `(topic, record)`.
fn flatten_event(event: &Event<'_>) -> (String, IngestRecord) {
    let meta = event.metadata();
    let mut contents = BTreeMap::new();
    event.record(&mut FieldCollector(&mut contents));

    if let Some(message) = contents.remove("message") {
        contents.insert("msg".to_string(), message);
    }
    if let Some(context) = contents.remove(CONTEXT_FIELD) {
        match serde_json::from_str::<BTreeMap<String, String>>(&context) {
            Ok(pairs) => {
                for (key, value) in pairs {
                    contents.entry(key).or_insert(value);
                }
            }
            Err(_) => {
                contents.insert(CONTEXT_FIELD.to_string(), context);
            }
        }
    }
    contents.insert("level".to_string(), meta.level().as_str().to_ascii_lowercase());
    contents.insert("target".to_string(), meta.target().to_string());
    if !contents.contains_key("caller") {
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            contents.insert("caller".to_string(), format!("{file}:{line}"));
        }
    }

    let topic = contents
        .remove("logger")
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let record = IngestRecord {
        time: chrono::Utc::now().timestamp(),
        contents,
    };
    (topic, record)
}

struct FieldCollector<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldCollector<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::collections::HashMap;
    use tracing_subscriber::layer::SubscriberExt;

    fn store(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn full_store(endpoint: &str) -> HashMap<String, String> {
        store(&[
            ("SVC_remote_Endpoint", endpoint),
            ("SVC_remote_AccessKeyID", "ak id"),
            ("SVC_remote_AccessKeySecret", "s3cr/t:"),
            ("SVC_remote_Project", "proj"),
            ("SVC_remote_LogStore", "store"),
        ])
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            parse_endpoint("ingest.example.com").unwrap(),
            ("http".to_string(), "ingest.example.com".to_string())
        );
        assert_eq!(
            parse_endpoint("https://ingest.example.com/").unwrap(),
            ("https".to_string(), "ingest.example.com".to_string())
        );
        assert_eq!(
            parse_endpoint("http://127.0.0.1:8080").unwrap(),
            ("http".to_string(), "127.0.0.1:8080".to_string())
        );
        assert!(parse_endpoint("  ").is_err());
    }

    #[test]
    fn test_generated_address_decodes_into_connection_parameters() {
        let map = full_store("https://ingest.example.com");
        let params = ScopedParams::new(&map, "_", "SVC", "remote");
        let address = IngestProvider::new("web-01").generate(&params).unwrap();

        let url = Url::parse(&address).unwrap();
        assert_eq!(url.scheme(), SCHEME);
        let config = batch_config(&url).unwrap();
        assert_eq!(config.endpoint.as_str(), "https://ingest.example.com/");
        assert_eq!(config.access_key_id, "ak id");
        assert_eq!(config.access_key_secret, "s3cr/t:");
        assert_eq!(config.project, "proj");
        assert_eq!(config.log_store, "store");
        assert_eq!(config.source, "web-01");
        assert_eq!(config.max_batch, DEFAULT_MAX_BATCH);
        assert_eq!(config.linger, DEFAULT_LINGER);
    }

    #[test]
    fn test_optional_batching_keys() {
        let mut map = full_store("ingest.example.com:9000");
        map.insert("SVC_remote_MaxBatch".to_string(), "16".to_string());
        map.insert("SVC_remote_LingerMs".to_string(), "250".to_string());
        let params = ScopedParams::new(&map, "_", "SVC", "remote");
        let address = IngestProvider::new("web-01").generate(&params).unwrap();

        let config = batch_config(&Url::parse(&address).unwrap()).unwrap();
        assert_eq!(config.endpoint.as_str(), "http://ingest.example.com:9000/");
        assert_eq!(config.max_batch, 16);
        assert_eq!(config.linger, Duration::from_millis(250));
    }

    #[test]
    fn test_generate_missing_keys_name_scoped_key() {
        let mut map = full_store("ingest.example.com");
        map.remove("SVC_remote_LogStore");
        let params = ScopedParams::new(&map, "_", "SVC", "remote");
        let err = IngestProvider::new("web-01").generate(&params).unwrap_err();
        assert!(matches!(err, ProviderError::MissingParam { ref key } if key == "SVC_remote_LogStore"));
    }

    #[test]
    fn test_generate_requires_source() {
        let map = full_store("ingest.example.com");
        let params = ScopedParams::new(&map, "_", "SVC", "remote");
        let err = IngestProvider::new("").generate(&params).unwrap_err();
        assert!(matches!(err, ProviderError::Unconfigured { ref provider, .. } if provider == "log-ingest"));
    }

    #[test]
    fn test_batch_config_requires_project_and_store() {
        let url = Url::parse("log-ingest://ak:sk@host?logStore=s").unwrap();
        assert!(matches!(batch_config(&url), Err(SinkError::MissingArg(ref a)) if a == "project"));

        let url = Url::parse("log-ingest://ak:sk@host?project=p&logStore=s&maxBatch=lots").unwrap();
        assert!(matches!(batch_config(&url), Err(SinkError::InvalidArg { ref arg, .. }) if arg == "maxBatch"));
    }

    #[test]
    fn test_layer_ships_events_by_logger_topic() {
        let mut server = mockito::Server::new();
        let shipped = server
            .mock("POST", "/projects/proj/logstores/store")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJsonString(r#"{"topic":"billing","source":"web-01"}"#.to_string()),
                Matcher::Regex(r#""msg":"invoice sent""#.to_string()),
                Matcher::Regex(r#""level":"info""#.to_string()),
                Matcher::Regex(r#""invoice":"42""#.to_string()),
            ]))
            .with_status(200)
            .expect(1)
            .create();

        let host = server.host_with_port();
        let address = format!("log-ingest://ak:sk@{host}?schema=http&source=web-01&project=proj&logStore=store");
        let sink = open(&Url::parse(&address).unwrap()).unwrap();
        let (mut destinations, closers) = sink.into_parts();
        let Some(crate::infrastructure::logging::sink_registry::Destination::Hijack(layer)) = destinations.pop()
        else {
            panic!("expected a hijacking destination");
        };

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(logger = "billing", invoice = "42", "invoice sent");
        });
        for closer in closers {
            closer().unwrap();
        }

        shipped.assert();
    }

    type Flattened = std::sync::Arc<std::sync::Mutex<Vec<(String, IngestRecord)>>>;

    struct Capture(Flattened);

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(flatten_event(event));
        }
    }

    fn capturing_dispatch() -> (tracing::Dispatch, Flattened) {
        let captured = Flattened::default();
        let subscriber = tracing_subscriber::registry().with(Capture(std::sync::Arc::clone(&captured)));
        (tracing::Dispatch::new(subscriber), captured)
    }

    #[test]
    fn test_event_without_logger_uses_default_topic() {
        let (dispatch, captured) = capturing_dispatch();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::warn!(caller = "src/app.rs:7", "disk low");
        });

        let captured = captured.lock().unwrap();
        let (topic, record) = &captured[0];
        assert_eq!(topic, DEFAULT_TOPIC);
        assert_eq!(record.contents["msg"], "disk low");
        assert_eq!(record.contents["level"], "warn");
        assert_eq!(record.contents["caller"], "src/app.rs:7");
        assert!(!record.contents.contains_key("logger"));
    }

    #[test]
    fn test_context_pairs_become_top_level_keys() {
        let (dispatch, captured) = capturing_dispatch();
        let logger = crate::services::logger::Logger::from_dispatch(dispatch);
        logger
            .named("orders")
            .with("order", 7)
            .with("region", "eu")
            .with("msg", "shadowed")
            .info("placed");

        let captured = captured.lock().unwrap();
        let (topic, record) = &captured[0];
        assert_eq!(topic, "orders");
        assert_eq!(record.contents["order"], "7");
        assert_eq!(record.contents["region"], "eu");
        assert_eq!(record.contents["msg"], "placed");
        assert!(!record.contents.contains_key("context"));
    }

    #[test]
    fn test_unparseable_context_is_kept_verbatim() {
        let (dispatch, captured) = capturing_dispatch();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(context = "not json", "odd");
        });

        let captured = captured.lock().unwrap();
        assert_eq!(captured[0].1.contents["context"], "not json");
    }
}
