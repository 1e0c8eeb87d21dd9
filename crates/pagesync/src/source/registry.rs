use std::collections::BTreeMap;
use std::sync::Arc;

use super::SourceProvider;

/// Providers keyed by their discriminator.
///
/// The orchestrator only ever resolves providers through the registry, so a
/// new source type is added by registering it, not by editing the engine.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SourceProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn SourceProvider>) -> &mut Self {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::debug!(provider = %name, "Replaced registered source provider");
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn SourceProvider>) -> Self {
        self.register(provider);
        self
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn SourceProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}
