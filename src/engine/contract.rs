//! The Engine Contract: the uniform interface every validator satisfies.
//!
//! An `async_trait` over `Send + Sync`, a name/capability surface, and a
//! single fallible entry point engines must honor cancellation within.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::errors::Result;
use crate::core::task::EngineResult;

/// Per-call context passed to every engine invocation. Carries the
/// task-scoped cancellation signal that is the sole cross-engine
/// coordination mechanism.
#[derive(Clone)]
pub struct EngineContext {
    /// Cancelled when the task-scoped deadline elapses or an external
    /// cancel cascades down from the root context.
    pub cancellation: CancellationToken,
    /// The id of the task this call belongs to, for scratch-directory naming
    /// and log correlation.
    pub task_id: String,
    /// The remaining budget at the time the engine was invoked.
    pub budget: Duration,
}

impl EngineContext {
    /// True if cancellation has already been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Outcome of [`Engine::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    /// All external tools the engine depends on are discoverable on PATH.
    Healthy,
    /// At least one dependency is missing; `missing` names it.
    Unhealthy { missing: Vec<String> },
}

/// The uniform contract every validation engine satisfies.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Stable engine name, used as the registry key and the `engine_results`
    /// map key on [`crate::core::task::ValidationResult`].
    fn name(&self) -> &str;

    /// Semantic version of this engine implementation.
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Languages this engine meaningfully analyzes. An empty slice means
    /// "language-agnostic".
    fn supported_languages(&self) -> &[&str] {
        &[]
    }

    /// Run this engine against a codebase under a given config. Must honor
    /// `ctx.cancellation`: on cancel, return promptly with a failed result
    /// whose error is `"cancelled"` rather than panicking or blocking.
    ///
    /// Implementations must not mutate `codebase` and must confine all
    /// writes to scratch space they create and remove themselves.
    async fn validate(
        &self,
        ctx: &EngineContext,
        codebase: &Codebase,
        config: &ValidationConfig,
    ) -> Result<EngineResult>;

    /// Verify that any external tools this engine shells out to are
    /// discoverable on PATH.
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
