//! Topic entries and the small text rules used while resolving them.

/// Logical key enabling the single, provider-named topic.
pub const CONFIG_ENABLE: &str = "Enable";
/// Logical key listing comma-separated topic prefixes.
pub const CONFIG_ENTRIES: &str = "Entries";
/// Logical key naming the provider of a topic (scoped by the topic prefix).
pub const CONFIG_PROVIDER: &str = "Provider";

/// A resolved topic: the scope prefix and the provider that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub prefix: String,
    pub provider: String,
}

impl TopicEntry {
    pub fn new(prefix: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            provider: provider.into(),
        }
    }
}

/// Boolean-like configuration words. Unrecognised input is `false`.
pub fn word_means_true(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "on" | "1"
    )
}

/// ASCII title case: an ASCII letter is upper-cased at the start of the
/// string or after any non-alphanumeric character. Other characters are
/// never changed, so the result does not depend on locale tables.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_boundary = true;
    for ch in text.chars() {
        if at_boundary && ch.is_ascii_alphabetic() {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        at_boundary = !ch.is_alphanumeric();
    }
    out
}
