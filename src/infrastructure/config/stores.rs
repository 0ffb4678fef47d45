//! Parameter store adapters.
//!
//! - `EnvStore`: process environment, keys matched exactly
//! - `FigmentStore`: any figment provider stack, scalar values as strings

use figment::value::Value;
use figment::Figment;

use crate::domain::ports::ParamStore;

/// Reads parameters from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvStore;

impl ParamStore for EnvStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Reads parameters from a figment.
///
/// The scoped key is used as a figment path, so `.` descends into nested
/// dictionaries. Only scalar values are visible; dictionaries and arrays
/// read as absent.
#[derive(Debug, Clone)]
pub struct FigmentStore {
    figment: Figment,
}

impl FigmentStore {
    pub fn new(figment: Figment) -> Self {
        Self { figment }
    }
}

impl From<Figment> for FigmentStore {
    fn from(figment: Figment) -> Self {
        Self::new(figment)
    }
}

impl ParamStore for FigmentStore {
    fn get(&self, key: &str) -> Option<String> {
        let value = self.figment.find_value(key).ok()?;
        scalar_to_string(&value)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(_, s) => Some(s.clone()),
        Value::Char(_, c) => Some(c.to_string()),
        Value::Bool(_, b) => Some(b.to_string()),
        Value::Num(..) => value
            .to_i128()
            .map(|n| n.to_string())
            .or_else(|| value.to_f64().map(|f| f.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Serialized, Yaml};

    #[test]
    fn test_env_store_reads_exact_key() {
        temp_env::with_vars(
            [("TOPICLOG_TEST_Enable", Some("yes")), ("TOPICLOG_TEST_Missing", None)],
            || {
                assert_eq!(EnvStore.get("TOPICLOG_TEST_Enable").as_deref(), Some("yes"));
                assert_eq!(EnvStore.get("TOPICLOG_TEST_Missing"), None);
            },
        );
    }

    #[test]
    fn test_figment_store_renders_scalars() {
        let figment = Figment::new()
            .merge(Serialized::default("APP_Enable", true))
            .merge(Serialized::default("APP_a_MaxSize", 64))
            .merge(Yaml::string("APP_Entries: \"a, b\"\nnested:\n  key: v\n"));
        let store = FigmentStore::new(figment);

        assert_eq!(store.get("APP_Enable").as_deref(), Some("true"));
        assert_eq!(store.get("APP_a_MaxSize").as_deref(), Some("64"));
        assert_eq!(store.get("APP_Entries").as_deref(), Some("a, b"));
        assert_eq!(store.get("nested.key").as_deref(), Some("v"));
        assert_eq!(store.get("nested"), None);
        assert_eq!(store.get("absent"), None);
    }
}
