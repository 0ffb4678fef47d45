//! topiclog - topic-routed structured logging
//!
//! A logging facade that sends records to the console and to any number of
//! "topic" sinks (rotating files, remote log ingestion) discovered from a
//! scoped key/value parameter store such as the process environment.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): errors, modes, topic entries and the
//!   parameter-store / provider ports
//! - **Service Layer** (`services`): provider registry, topic resolution,
//!   core composition and the logger facade
//! - **Infrastructure Layer** (`infrastructure`): settings, parameter
//!   stores, sink opening and the concrete backends
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use topiclog::infrastructure::config::{EnvStore, Options};
//! use topiclog::infrastructure::logging::rolling_file;
//! use topiclog::domain::models::Mode;
//!
//! fn main() -> Result<(), topiclog::LogError> {
//!     let mut options = Options::new(Mode::Product)
//!         .with_entry("APP_LOG")
//!         .with_store(EnvStore);
//!     rolling_file::register(&mut options, "/var/log/app")?;
//!
//!     let (logger, shutdown) = topiclog::new(options)?;
//!     logger.named("billing").with("invoice", 42).info("invoice sent");
//!     shutdown.run();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{LogError, LogResult, ProviderError, SinkError};
pub use domain::models::{Mode, TopicEntry};
pub use domain::ports::{ParamStore, ScopedParams, TopicProvider};
pub use infrastructure::config::{ConfigError, ConfigLoader, EnvStore, FigmentStore, Options, Settings};
pub use services::logger::new;
pub use services::{Logger, Shutdown};
