//! Scoped parameter lookup.
//!
//! One flat key/value namespace serves several independently configured
//! topics by qualifying every logical key with the global entry and the
//! topic prefix: `join(separator, nonempty([entry, prefix, key]))`.

use super::param_store::ParamStore;
use crate::domain::errors::ProviderError;

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Build the fully scoped key for `key`, omitting empty segments.
pub fn scope_key(separator: &str, entry: &str, prefix: &str, key: &str) -> String {
    [entry, prefix, key]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Lookup bound to one scope.
///
/// Providers only ever see this type: they ask for logical key names and
/// receive whatever the active topic's scope resolves to.
#[derive(Clone, Copy)]
pub struct ScopedParams<'a> {
    store: &'a dyn ParamStore,
    separator: &'a str,
    entry: &'a str,
    prefix: &'a str,
}

impl<'a> ScopedParams<'a> {
    pub fn new(store: &'a dyn ParamStore, separator: &'a str, entry: &'a str, prefix: &'a str) -> Self {
        let separator = if separator.is_empty() {
            DEFAULT_SEPARATOR
        } else {
            separator
        };
        Self {
            store,
            separator,
            entry,
            prefix,
        }
    }

    /// Same store and entry, different topic prefix.
    pub fn with_prefix(&self, prefix: &'a str) -> Self {
        Self { prefix, ..*self }
    }

    pub fn prefix(&self) -> &str {
        self.prefix
    }

    pub fn scoped_key(&self, key: &str) -> String {
        scope_key(self.separator, self.entry, self.prefix, key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(&self.scoped_key(key))
    }

    /// Like [`get`](Self::get) but a missing key is an error naming the
    /// scoped key.
    pub fn require(&self, key: &str) -> Result<String, ProviderError> {
        let scoped = self.scoped_key(key);
        self.store
            .get(&scoped)
            .ok_or(ProviderError::MissingParam { key: scoped })
    }
}

impl std::fmt::Debug for ScopedParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedParams")
            .field("separator", &self.separator)
            .field("entry", &self.entry)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
