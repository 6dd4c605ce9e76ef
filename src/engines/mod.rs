//! Concrete engines satisfying the [`crate::engine::Engine`] contract.

pub mod integration_engine;
pub mod performance_engine;
pub mod runtime_engine;
pub mod security_engine;
pub mod static_engine;

use std::sync::Arc;

use crate::engine::registry::{EngineMetadata, EngineRegistry};
use crate::engine::tool::ExternalToolAdapter;
use integration_engine::IntegrationEngine;
use performance_engine::PerformanceEngine;
use runtime_engine::{RuntimeEngine, SandboxLimits, SandboxProvider};
use security_engine::SecurityEngine;
use static_engine::StaticEngine;

/// Build a registry with all five engines registered under their canonical
/// names, ready for [`crate::orchestrator::Orchestrator::new`].
pub fn default_registry(
    tool: Arc<dyn ExternalToolAdapter>,
    sandbox: Arc<dyn SandboxProvider>,
) -> EngineRegistry {
    let mut registry = EngineRegistry::new();

    registry.register(
        "static",
        EngineMetadata {
            name: "static".to_string(),
            description: "Language linters and AST-driven complexity analysis".to_string(),
            supported_languages: vec![
                "go".to_string(),
                "python".to_string(),
                "javascript".to_string(),
                "typescript".to_string(),
            ],
        },
        {
            let tool = Arc::clone(&tool);
            move || Arc::new(StaticEngine::new(Arc::clone(&tool)))
        },
    );

    registry.register(
        "runtime",
        EngineMetadata {
            name: "runtime".to_string(),
            description: "Sandboxed execution reporting runtime findings and resource usage".to_string(),
            supported_languages: vec!["go".to_string(), "python".to_string(), "javascript".to_string()],
        },
        {
            let sandbox = Arc::clone(&sandbox);
            move || Arc::new(RuntimeEngine::new(Arc::clone(&sandbox), SandboxLimits::default()))
        },
    );

    registry.register(
        "security",
        EngineMetadata {
            name: "security".to_string(),
            description: "Deterministic pattern scan for embedded secrets and risky constructs".to_string(),
            supported_languages: vec![],
        },
        || Arc::new(SecurityEngine),
    );

    registry.register(
        "integration",
        EngineMetadata {
            name: "integration".to_string(),
            description: "Presence of test coverage relative to source files".to_string(),
            supported_languages: vec![],
        },
        || Arc::new(IntegrationEngine),
    );

    registry.register(
        "performance",
        EngineMetadata {
            name: "performance".to_string(),
            description: "Heuristic flags for performance-adjacent file shape".to_string(),
            supported_languages: vec![],
        },
        || Arc::new(PerformanceEngine),
    );

    registry
}
