//! Registry of topic providers.

use std::sync::Arc;

use crate::domain::errors::LogError;
use crate::domain::ports::TopicProvider;

/// Ordered set of providers, unique by case-insensitive name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TopicProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Fails if one with the same name is already present.
    pub fn register<P>(&mut self, provider: P) -> Result<(), LogError>
    where
        P: TopicProvider + 'static,
    {
        let name = provider.name();
        if self.find(name).is_some() {
            return Err(LogError::ProviderConflict(name.to_string()));
        }
        self.providers.push(Arc::new(provider));
        Ok(())
    }

    /// Find a provider by name, ignoring ASCII case.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn TopicProvider>, LogError> {
        self.find(name)
            .cloned()
            .ok_or_else(|| LogError::UnknownProvider(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn TopicProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ProviderError;
    use crate::domain::ports::ScopedParams;

    struct Fixed(&'static str);

    impl TopicProvider for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn generate(&self, _params: &ScopedParams<'_>) -> Result<String, ProviderError> {
            Ok(format!("{}://fixed", self.0))
        }
    }

    #[test]
    fn test_register_and_lookup_ignore_case() {
        let mut registry = ProviderRegistry::new();
        registry.register(Fixed("lumber")).unwrap();

        let provider = registry.lookup("LUMBER").unwrap();
        assert_eq!(provider.name(), "lumber");
        assert_eq!(registry.names(), vec!["lumber"]);
    }

    #[test]
    fn test_register_conflict() {
        let mut registry = ProviderRegistry::new();
        registry.register(Fixed("lumber")).unwrap();
        let err = registry.register(Fixed("Lumber")).unwrap_err();
        assert!(matches!(err, LogError::ProviderConflict(ref name) if name == "Lumber"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        let err = registry.lookup("kafka").unwrap_err();
        assert!(matches!(err, LogError::UnknownProvider(ref name) if name == "kafka"));
    }
}
