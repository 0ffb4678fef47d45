//! Logger facade and lifecycle.
//!
//! [`new`] consumes [`Options`], resolves and opens every topic, composes
//! the console and topic layers and returns the [`Logger`] together with
//! the [`Shutdown`] handle that flushes and closes the sinks.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::Arc;

use tracing::{info, Dispatch, Level};

use super::composer::{compose, console_layers, topic_layer};
use super::topic_resolver::open_topics;
use crate::domain::errors::LogError;
use crate::infrastructure::config::Options;
use crate::infrastructure::logging::Closer;

/// Build the logger described by `options`.
///
/// Either every topic is opened and composed, or an error is returned and
/// whatever was opened on the way is closed again.
pub fn new(mut options: Options) -> Result<(Logger, Shutdown), LogError> {
    let mode = options.mode();
    let mut layers = console_layers(mode, options.json_on_product(), options.take_console());
    let mut closers: Vec<Closer> = Vec::new();
    let mut failure = None;
    let mut topics = 0_usize;

    for (entry, sink) in open_topics(&options)? {
        let (destinations, sink_closers) = sink.into_parts();
        closers.extend(sink_closers);
        if failure.is_some() {
            continue;
        }
        match topic_layer(destinations) {
            Ok(Some(layer)) => {
                layers.push(layer);
                topics += 1;
            }
            Ok(None) => {}
            Err(source) => {
                failure = Some(LogError::Open {
                    prefix: entry.prefix,
                    provider: entry.provider,
                    source,
                });
            }
        }
    }

    if let Some(err) = failure {
        drop(layers);
        Shutdown { closers }.run();
        return Err(err);
    }

    info!(mode = %mode, topics, "logger composed");
    Ok((Logger::from_dispatch(compose(layers)), Shutdown { closers }))
}

/// Flushes the console and closes every sink, in opening order.
pub struct Shutdown {
    closers: Vec<Closer>,
}

impl Shutdown {
    /// Number of close hooks that will run.
    pub fn len(&self) -> usize {
        self.closers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closers.is_empty()
    }

    /// Flush and close. Individual failures are ignored.
    pub fn run(self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        for closer in self.closers {
            let _ = closer();
        }
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("closers", &self.closers.len())
            .finish()
    }
}

/// Handle for emitting records through the composed core.
///
/// Cheap to clone; clones share the core. Every record carries
/// `caller = "file:line"` of the call site, `logger` when named,
/// `context` when context was attached and `stacktrace` for errors.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    name: Option<Arc<str>>,
    context: BTreeMap<String, String>,
}

impl Logger {
    /// Wrap an existing dispatch.
    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            name: None,
            context: BTreeMap::new(),
        }
    }

    /// Child logger with `name` appended to the dotted logger name.
    #[must_use]
    pub fn named(&self, name: &str) -> Self {
        let name: Arc<str> = match &self.name {
            Some(parent) => format!("{parent}.{name}").into(),
            None => name.into(),
        };
        Self {
            name: Some(name),
            ..self.clone()
        }
    }

    /// Child logger carrying an extra context pair.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let mut child = self.clone();
        child.context.insert(key.into(), value.to_string());
        child
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    #[track_caller]
    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Level::TRACE, message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::DEBUG, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::INFO, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::WARN, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::ERROR, message);
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        let location = Location::caller();
        let caller = format!("{}:{}", location.file(), location.line());
        self.emit(level, &caller, &message);
    }

    fn emit(&self, level: Level, caller: &str, message: &dyn fmt::Display) {
        let logger = self.name.as_deref();
        let context = self.context_json();
        let context = context.as_deref();

        tracing::dispatcher::with_default(&self.dispatch, || match level {
            Level::ERROR => {
                let stacktrace = Backtrace::force_capture();
                tracing::error!(caller, logger, context, stacktrace = %stacktrace, "{message}");
            }
            Level::WARN => tracing::warn!(caller, logger, context, "{message}"),
            Level::INFO => tracing::info!(caller, logger, context, "{message}"),
            Level::DEBUG => tracing::debug!(caller, logger, context, "{message}"),
            _ => tracing::trace!(caller, logger, context, "{message}"),
        });
    }

    fn context_json(&self) -> Option<String> {
        if self.context.is_empty() {
            return None;
        }
        serde_json::to_string(&self.context).ok()
    }

    /// Run `f` with this logger as the thread's default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this logger the process-wide default subscriber.
    pub fn install_global(&self) -> Result<(), LogError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|err| LogError::GlobalInstall(err.to_string()))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
