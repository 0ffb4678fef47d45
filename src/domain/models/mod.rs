//! Domain models: deployment mode and topic entries.

pub mod mode;
pub mod topic;

pub use mode::Mode;
pub use topic::{title_case, word_means_true, TopicEntry, CONFIG_ENABLE, CONFIG_ENTRIES, CONFIG_PROVIDER};
