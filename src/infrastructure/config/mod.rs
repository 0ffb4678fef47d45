//! Configuration infrastructure
//!
//! - Settings loading with figment (defaults, YAML file, environment)
//! - Parameter stores backed by the environment or a figment
//! - Logger construction options

pub mod loader;
pub mod options;
pub mod stores;

pub use loader::{ConfigError, ConfigLoader, Settings};
pub use options::{ConsoleWriters, Options};
pub use stores::{EnvStore, FigmentStore};
