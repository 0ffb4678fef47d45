//! Topic provider port.
//!
//! A provider is a named plugin that knows how to turn scoped
//! configuration into a sink address for one backend kind. The address is
//! the contract boundary: whatever the provider generates must be
//! openable by the sink opener registered for its scheme.

use super::scope::ScopedParams;
use crate::domain::errors::ProviderError;

/// Port for sink-address generators.
pub trait TopicProvider: Send + Sync {
    /// Name the topic configuration refers to (matched case-insensitively).
    fn name(&self) -> &str;

    /// Produce a sink address from scoped parameters.
    ///
    /// An empty string means "no sink for this topic" and is not an error.
    fn generate(&self, params: &ScopedParams<'_>) -> Result<String, ProviderError>;
}

impl std::fmt::Debug for dyn TopicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicProvider")
            .field("name", &self.name())
            .finish()
    }
}
