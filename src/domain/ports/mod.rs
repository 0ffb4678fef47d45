//! Port trait definitions
//!
//! - ParamStore: read-only key/value configuration source
//! - ScopedParams: entry/prefix qualified view over a store
//! - TopicProvider: scoped configuration to sink address

pub mod param_store;
pub mod provider;
pub mod scope;

pub use param_store::ParamStore;
pub use provider::TopicProvider;
pub use scope::{scope_key, ScopedParams, DEFAULT_SEPARATOR};
