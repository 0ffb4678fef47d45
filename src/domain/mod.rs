//! Domain layer for topiclog
//!
//! Pure types shared by every other layer: the error taxonomy, the
//! deployment mode, topic entries and the port traits that parameter
//! stores and topic providers implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{LogError, LogResult, ProviderError, SinkError};
