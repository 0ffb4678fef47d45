//! Infrastructure layer module
//!
//! - Configuration: settings loader, parameter stores, options
//! - Logging: sink opening and the concrete backends
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
