//! Engine Registry: name → (factory, metadata), populated once at
//! process init and read-only thereafter — a factory-table keyed by engine
//! name rather than by language adapter.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ValidationError};
use crate::engine::contract::Engine;

/// Metadata describing a registered engine, returned by [`EngineRegistry::list`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetadata {
    /// Registry key / engine name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Languages this engine meaningfully analyzes (empty = language-agnostic).
    pub supported_languages: Vec<String>,
}

type EngineFactory = Arc<dyn Fn() -> Arc<dyn Engine> + Send + Sync>;

/// Read-only (after startup) name → engine factory table.
///
/// Registration happens once during process init (see
/// [`crate::engines::default_registry`]); [`EngineRegistry::create`] and
/// [`EngineRegistry::list`] are then O(1) lookups with no further mutation.
pub struct EngineRegistry {
    factories: HashMap<String, EngineFactory>,
    metadata: HashMap<String, EngineMetadata>,
}

impl EngineRegistry {
    /// An empty registry with nothing registered.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Register an engine factory under `name`. Intended to be called only
    /// during process init, before the registry is shared across workers.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        metadata: EngineMetadata,
        factory: impl Fn() -> Arc<dyn Engine> + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.factories.insert(name.clone(), Arc::new(factory));
        self.metadata.insert(name, metadata);
    }

    /// Instantiate a fresh engine instance for `name`.
    pub fn create(&self, name: &str) -> Result<Arc<dyn Engine>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ValidationError::unknown_engine(name))
    }

    /// List metadata for every registered engine.
    pub fn list(&self) -> Vec<EngineMetadata> {
        let mut entries: Vec<_> = self.metadata.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Metadata for a single engine, if registered.
    pub fn metadata(&self, name: &str) -> Option<&EngineMetadata> {
        self.metadata.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered engines.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry has no registered engines.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::contract::{EngineContext, HealthStatus};
    use crate::core::codebase::Codebase;
    use crate::core::config::ValidationConfig;
    use crate::core::task::EngineResult;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubEngine;

    #[async_trait]
    impl Engine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        async fn validate(
            &self,
            _ctx: &EngineContext,
            _codebase: &Codebase,
            _config: &ValidationConfig,
        ) -> crate::core::errors::Result<EngineResult> {
            Ok(EngineResult::completed("stub", 100.0, Duration::from_millis(1)))
        }
    }

    #[test]
    fn unknown_engine_lookup_fails() {
        let registry = EngineRegistry::new();
        assert!(matches!(
            registry.create("bogus"),
            Err(ValidationError::UnknownEngine { .. })
        ));
    }

    #[test]
    fn registered_engine_is_constructible() {
        let mut registry = EngineRegistry::new();
        registry.register(
            "stub",
            EngineMetadata {
                name: "stub".to_string(),
                description: "test stub".to_string(),
                supported_languages: vec![],
            },
            || Arc::new(StubEngine),
        );
        assert!(registry.contains("stub"));
        let engine = registry.create("stub").unwrap();
        assert_eq!(engine.name(), "stub");
        assert_eq!(registry.list().len(), 1);
    }

    #[tokio::test]
    async fn default_health_check_is_healthy() {
        let engine = StubEngine;
        assert_eq!(engine.health_check().await, HealthStatus::Healthy);
    }
}
