//! Services: provider registry, topic resolution, core composition and the
//! logger facade.

pub mod composer;
pub mod logger;
pub mod provider_registry;
pub mod topic_resolver;

pub use logger::{Logger, Shutdown};
pub use provider_registry::ProviderRegistry;
pub use topic_resolver::{open_topic, open_topics, resolve_topics};
