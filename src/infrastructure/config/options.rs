//! Logger construction options.
//!
//! Options carry the deployment mode, the parameter scope, the parameter
//! store and the explicit provider and sink-scheme registries. They are
//! consumed by [`crate::services::logger::new`].

use std::sync::Arc;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use url::Url;

use super::loader::Settings;
use crate::domain::errors::{LogError, SinkError};
use crate::domain::models::Mode;
use crate::domain::ports::{ParamStore, TopicProvider, DEFAULT_SEPARATOR};
use crate::infrastructure::logging::{OpenedSink, SinkRegistry};
use crate::services::provider_registry::ProviderRegistry;

/// Writers behind the two console layers.
pub struct ConsoleWriters {
    pub stdout: BoxMakeWriter,
    pub stderr: BoxMakeWriter,
}

impl Default for ConsoleWriters {
    fn default() -> Self {
        Self {
            stdout: BoxMakeWriter::new(std::io::stdout),
            stderr: BoxMakeWriter::new(std::io::stderr),
        }
    }
}

impl std::fmt::Debug for ConsoleWriters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleWriters").finish_non_exhaustive()
    }
}

/// Everything needed to build a logger.
#[derive(Debug)]
pub struct Options {
    mode: Mode,
    entry: String,
    separator: String,
    store: Option<Arc<dyn ParamStore>>,
    json_on_product: bool,
    providers: ProviderRegistry,
    sinks: SinkRegistry,
    console: ConsoleWriters,
}

impl Default for Options {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl Options {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            entry: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            store: None,
            json_on_product: false,
            providers: ProviderRegistry::new(),
            sinks: SinkRegistry::new(),
            console: ConsoleWriters::default(),
        }
    }

    /// Parse the mode from text, failing on anything but
    /// `develop`, `testing` or `product`.
    pub fn from_mode_str(mode: &str) -> Result<Self, LogError> {
        Ok(Self::new(mode.parse()?))
    }

    /// Mode, scope and encoding taken from loaded settings. Providers, sink
    /// schemes and the store are still up to the caller.
    pub fn from_settings(settings: &Settings) -> Result<Self, LogError> {
        Ok(Self::from_mode_str(&settings.mode)?
            .with_entry(&settings.entry)
            .with_separator(&settings.separator)
            .with_json_on_product(settings.json_on_product))
    }

    /// Global scope qualifier prepended to every key.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Key separator; empty means the default `_`.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        self.separator = if separator.is_empty() {
            DEFAULT_SEPARATOR.to_string()
        } else {
            separator
        };
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: impl ParamStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    #[must_use]
    pub fn with_shared_store(mut self, store: Arc<dyn ParamStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use the JSON encoder on the console in product mode.
    #[must_use]
    pub fn with_json_on_product(mut self, enabled: bool) -> Self {
        self.json_on_product = enabled;
        self
    }

    /// Replace the process streams behind the console layers.
    #[must_use]
    pub fn with_console_writers(mut self, stdout: BoxMakeWriter, stderr: BoxMakeWriter) -> Self {
        self.console = ConsoleWriters { stdout, stderr };
        self
    }

    pub fn register_provider<P>(&mut self, provider: P) -> Result<(), LogError>
    where
        P: TopicProvider + 'static,
    {
        self.providers.register(provider)
    }

    pub fn register_sink<F>(&mut self, scheme: &str, opener: F) -> Result<(), LogError>
    where
        F: Fn(&Url) -> Result<OpenedSink, SinkError> + Send + Sync + 'static,
    {
        self.sinks.register(scheme, opener)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn store(&self) -> Option<&dyn ParamStore> {
        self.store.as_deref()
    }

    pub fn json_on_product(&self) -> bool {
        self.json_on_product
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    pub(crate) fn take_console(&mut self) -> ConsoleWriters {
        std::mem::take(&mut self.console)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.mode(), Mode::Develop);
        assert_eq!(options.entry(), "");
        assert_eq!(options.separator(), "_");
        assert!(options.store().is_none());
        assert!(!options.json_on_product());
        assert!(options.providers().is_empty());
    }

    #[test]
    fn test_from_mode_str_rejects_unknown_mode() {
        assert_eq!(Options::from_mode_str("product").unwrap().mode(), Mode::Product);
        let err = Options::from_mode_str("staging").unwrap_err();
        assert!(matches!(err, LogError::InvalidMode(ref m) if m == "staging"));
    }

    #[test]
    fn test_empty_separator_is_default() {
        let options = Options::default().with_separator("");
        assert_eq!(options.separator(), "_");
        let options = Options::default().with_separator(".");
        assert_eq!(options.separator(), ".");
    }

    #[test]
    fn test_store_is_visible() {
        let map: HashMap<String, String> = [("APP_Enable".to_string(), "yes".to_string())].into();
        let options = Options::default().with_entry("APP").with_store(map);
        assert_eq!(options.store().and_then(|s| s.get("APP_Enable")).as_deref(), Some("yes"));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            mode: "testing".to_string(),
            entry: "SVC_LOG".to_string(),
            separator: "__".to_string(),
            json_on_product: true,
            ..Settings::default()
        };
        let options = Options::from_settings(&settings).unwrap();
        assert_eq!(options.mode(), Mode::Testing);
        assert_eq!(options.entry(), "SVC_LOG");
        assert_eq!(options.separator(), "__");
        assert!(options.json_on_product());
    }
}
