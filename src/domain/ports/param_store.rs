use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only key/value lookup that configuration is resolved from.
///
/// The store is owned by the caller; the logger never mutates it. A key
/// that is present with an empty value is distinct from an absent key.
pub trait ParamStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl std::fmt::Debug for dyn ParamStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ParamStore")
    }
}

impl ParamStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ParamStore for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<T: ParamStore + ?Sized> ParamStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: ParamStore + ?Sized> ParamStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_stores_distinguish_empty_from_absent() {
        let mut map = HashMap::new();
        map.insert("A".to_string(), String::new());
        assert_eq!(ParamStore::get(&map, "A"), Some(String::new()));
        assert_eq!(ParamStore::get(&map, "B"), None);

        let tree: BTreeMap<String, String> = [("A".to_string(), "1".to_string())].into();
        let shared: Arc<dyn ParamStore> = Arc::new(tree);
        assert_eq!(shared.get("A").as_deref(), Some("1"));
    }
}
