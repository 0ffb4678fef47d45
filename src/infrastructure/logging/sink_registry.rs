//! Sink opening.
//!
//! An address is opened into an [`OpenedSink`]: a list of destinations and
//! the close hooks to run at shutdown. A destination is either a byte
//! stream that the generic encoder writes into, or a hijacking layer that
//! replaces the encoder entirely (backends that own their formatting and
//! delivery, such as the batched ingestion shipper).
//!
//! Dispatch by address:
//! - `stdout` / `stderr`: process streams, nothing to close
//! - a plain path or a `file://` URL: append-mode file behind a
//!   non-blocking writer
//! - any other scheme: the opener registered for it

use std::fs::OpenOptions;
use std::path::Path;

use tracing::debug;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{Layer, Registry};
use url::Url;

use crate::domain::errors::{LogError, SinkError};

/// A type-erased logging core.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Shutdown hook returned by an opener.
pub type Closer = Box<dyn FnOnce() -> Result<(), SinkError> + Send>;

/// Opener for one address scheme.
pub type SinkOpenFn = Box<dyn Fn(&Url) -> Result<OpenedSink, SinkError> + Send + Sync>;

/// Schemes handled without registration.
const BUILTIN_SCHEMES: &[&str] = &["file", "stdout", "stderr"];

/// One opened write target.
pub enum Destination {
    /// Bytes for the generic readable encoder.
    Stream(BoxMakeWriter),
    /// A ready-made core that supersedes the generic encoder.
    Hijack(BoxedLayer),
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Destination::Stream"),
            Self::Hijack(_) => f.write_str("Destination::Hijack"),
        }
    }
}

/// Destinations plus the hooks that close them, in opening order.
#[derive(Default)]
pub struct OpenedSink {
    destinations: Vec<Destination>,
    closers: Vec<Closer>,
}

impl OpenedSink {
    pub fn stream(writer: BoxMakeWriter) -> Self {
        Self {
            destinations: vec![Destination::Stream(writer)],
            closers: Vec::new(),
        }
    }

    pub fn hijack(layer: BoxedLayer) -> Self {
        Self {
            destinations: vec![Destination::Hijack(layer)],
            closers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_closer<F>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Result<(), SinkError> + Send + 'static,
    {
        self.closers.push(Box::new(closer));
        self
    }

    pub fn append(&mut self, other: Self) {
        self.destinations.extend(other.destinations);
        self.closers.extend(other.closers);
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn into_parts(self) -> (Vec<Destination>, Vec<Closer>) {
        (self.destinations, self.closers)
    }

    /// Run every close hook, ignoring failures.
    pub fn close(self) {
        for closer in self.closers {
            let _ = closer();
        }
    }
}

impl std::fmt::Debug for OpenedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedSink")
            .field("destinations", &self.destinations)
            .field("closers", &self.closers.len())
            .finish()
    }
}

/// Scheme-to-opener table, populated explicitly by the caller.
#[derive(Default)]
pub struct SinkRegistry {
    openers: Vec<(String, SinkOpenFn)>,
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an opener. Schemes compare case-insensitively and the
    /// built-in schemes cannot be replaced.
    pub fn register<F>(&mut self, scheme: &str, opener: F) -> Result<(), LogError>
    where
        F: Fn(&Url) -> Result<OpenedSink, SinkError> + Send + Sync + 'static,
    {
        let scheme = scheme.to_ascii_lowercase();
        if BUILTIN_SCHEMES.contains(&scheme.as_str())
            || self.openers.iter().any(|(known, _)| *known == scheme)
        {
            return Err(LogError::SchemeConflict(scheme));
        }
        self.openers.push((scheme, Box::new(opener)));
        Ok(())
    }

    pub fn schemes(&self) -> Vec<&str> {
        self.openers.iter().map(|(scheme, _)| scheme.as_str()).collect()
    }

    /// Open one address.
    pub fn open(&self, address: &str) -> Result<OpenedSink, SinkError> {
        match address {
            "stdout" => return Ok(OpenedSink::stream(BoxMakeWriter::new(std::io::stdout))),
            "stderr" => return Ok(OpenedSink::stream(BoxMakeWriter::new(std::io::stderr))),
            _ => {}
        }

        let url = match Url::parse(address) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => return open_file(Path::new(address)),
            Err(source) => {
                return Err(SinkError::InvalidAddress {
                    address: address.to_string(),
                    source,
                })
            }
        };

        if url.scheme() == "file" {
            let path = url.to_file_path().map_err(|()| SinkError::InvalidArg {
                arg: "path".to_string(),
                reason: format!("`{address}` is not a local file path"),
            })?;
            return open_file(&path);
        }

        let opener = self
            .openers
            .iter()
            .find(|(scheme, _)| scheme == url.scheme())
            .map(|(_, opener)| opener)
            .ok_or_else(|| SinkError::UnknownScheme(url.scheme().to_string()))?;

        debug!(scheme = url.scheme(), "opening sink");
        opener(&url)
    }
}

fn open_file(path: &Path) -> Result<OpenedSink, SinkError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    Ok(OpenedSink::stream(BoxMakeWriter::new(writer)).with_closer(move || {
        drop(guard);
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    fn noop_opener(_: &Url) -> Result<OpenedSink, SinkError> {
        Ok(OpenedSink::default())
    }

    #[test]
    fn test_register_rejects_duplicate_scheme_case_insensitively() {
        let mut registry = SinkRegistry::new();
        registry.register("rolling-file", noop_opener).unwrap();
        let err = registry.register("Rolling-File", noop_opener).unwrap_err();
        assert!(matches!(err, LogError::SchemeConflict(ref s) if s == "rolling-file"));
    }

    #[test]
    fn test_register_rejects_builtin_scheme() {
        let mut registry = SinkRegistry::new();
        assert!(matches!(
            registry.register("file", noop_opener),
            Err(LogError::SchemeConflict(_))
        ));
    }

    #[test]
    fn test_open_unknown_scheme() {
        let registry = SinkRegistry::new();
        let err = registry.open("kafka://broker:9092").unwrap_err();
        assert!(matches!(err, SinkError::UnknownScheme(ref s) if s == "kafka"));
    }

    #[test]
    fn test_open_dispatches_to_registered_opener() {
        let mut registry = SinkRegistry::new();
        registry
            .register("memory", |url: &Url| {
                assert_eq!(url.query(), Some("k=v"));
                Ok(OpenedSink::stream(BoxMakeWriter::new(std::io::sink)))
            })
            .unwrap();
        let sink = registry.open("memory://localhost?k=v").unwrap();
        assert_eq!(sink.destinations().len(), 1);
        assert!(matches!(sink.destinations()[0], Destination::Stream(_)));
    }

    #[test]
    fn test_open_console_words() {
        let registry = SinkRegistry::new();
        assert!(!registry.open("stdout").unwrap().is_empty());
        assert!(!registry.open("stderr").unwrap().is_empty());
    }

    #[test]
    fn test_open_plain_path_appends_and_flushes_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.log");
        std::fs::write(&path, "existing\n").unwrap();

        let registry = SinkRegistry::new();
        let sink = registry.open(path.to_str().unwrap()).unwrap();
        let (destinations, closers) = sink.into_parts();
        let Destination::Stream(writer) = &destinations[0] else {
            panic!("expected a stream destination");
        };
        writer.make_writer().write_all(b"appended\n").unwrap();
        drop(destinations);
        for closer in closers {
            closer().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "existing\nappended\n");
    }
}
