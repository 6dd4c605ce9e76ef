//! Runtime Engine: executes a codebase inside an isolated
//! sandbox and reports runtime findings and resource usage.
//!
//! The sandbox substrate is abstracted behind [`SandboxProvider`], mirroring
//! [`crate::engine::tool::ExternalToolAdapter`]'s split between a production
//! adapter and an in-process fake used in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::errors::Result;
use crate::core::finding::{Finding, Severity};
use crate::core::task::EngineResult;
use crate::engine::contract::{Engine, EngineContext, HealthStatus};

/// Hard resource limits enforced by the substrate, never by the engine
/// itself.
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    pub wall_clock: Duration,
    pub memory_bytes: u64,
    pub cpu_cores: f64,
    pub scratch_disk_bytes: u64,
    /// Endpoints explicitly allowed through an otherwise default-deny
    /// network policy. Empty means no egress at all.
    pub allowed_egress: Vec<String>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            wall_clock: Duration::from_secs(60),
            memory_bytes: 512 * 1024 * 1024,
            cpu_cores: 1.0,
            scratch_disk_bytes: 256 * 1024 * 1024,
            allowed_egress: Vec::new(),
        }
    }
}

/// How a sandboxed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    CompletedCleanly,
    NonZeroExit,
    Panicked,
    OutOfMemory,
    TimedOut,
}

/// Captured output of one sandboxed run.
#[derive(Debug, Clone)]
pub struct SandboxRunResult {
    pub outcome: RunOutcome,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub peak_memory_bytes: u64,
    pub cpu_seconds: f64,
    pub wall_time: Duration,
}

/// Opaque handle to an acquired sandbox, released by
/// [`SandboxProvider::destroy_sandbox`].
pub struct SandboxHandle {
    pub id: String,
}

/// The isolation substrate's synchronous-from-the-engine's-viewpoint
/// contract: create-sandbox, copy-in, exec, collect-metrics,
/// destroy-sandbox.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    async fn create_sandbox(&self, limits: &SandboxLimits) -> std::io::Result<SandboxHandle>;
    async fn copy_in(&self, sandbox: &SandboxHandle, files: &Codebase) -> std::io::Result<()>;
    async fn exec(&self, sandbox: &SandboxHandle, cmd: &str) -> std::io::Result<SandboxRunResult>;
    async fn destroy_sandbox(&self, sandbox: SandboxHandle) -> std::io::Result<()>;
}

/// A bare-subprocess stand-in for a real isolation substrate: runs the
/// recipe as a plain child process with a wall-clock timeout and no
/// network/filesystem/privilege isolation at all. Suitable for local
/// development against trusted codebases only; a production deployment
/// must supply a substrate that actually satisfies the non-root,
/// read-only-root, dropped-capabilities, network-denied contract.
pub struct LocalProcessSandboxProvider {
    scratch_root: std::path::PathBuf,
}

impl LocalProcessSandboxProvider {
    pub fn new(scratch_root: std::path::PathBuf) -> Self {
        Self { scratch_root }
    }
}

#[async_trait]
impl SandboxProvider for LocalProcessSandboxProvider {
    async fn create_sandbox(&self, _limits: &SandboxLimits) -> std::io::Result<SandboxHandle> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.scratch_root.join(format!("runtime-{id}"));
        std::fs::create_dir_all(&path)?;
        Ok(SandboxHandle { id })
    }

    async fn copy_in(&self, sandbox: &SandboxHandle, files: &Codebase) -> std::io::Result<()> {
        let dir = self.scratch_root.join(format!("runtime-{}", sandbox.id));
        for file in &files.files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, &file.content)?;
        }
        Ok(())
    }

    async fn exec(&self, sandbox: &SandboxHandle, cmd: &str) -> std::io::Result<SandboxRunResult> {
        let dir = self.scratch_root.join(format!("runtime-{}", sandbox.id));
        let start = Instant::now();
        let mut parts = cmd.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(SandboxRunResult {
                outcome: RunOutcome::NonZeroExit,
                exit_code: None,
                stdout: String::new(),
                stderr: "empty command".to_string(),
                peak_memory_bytes: 0,
                cpu_seconds: 0.0,
                wall_time: Duration::ZERO,
            });
        };
        let mut command = tokio::process::Command::new(program);
        command.args(parts).current_dir(&dir);

        let outcome = tokio::time::timeout(Duration::from_secs(30), command.output()).await;
        let wall_time = start.elapsed();
        match outcome {
            Ok(Ok(output)) => Ok(SandboxRunResult {
                outcome: if output.status.success() {
                    RunOutcome::CompletedCleanly
                } else {
                    RunOutcome::NonZeroExit
                },
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                peak_memory_bytes: 0,
                cpu_seconds: wall_time.as_secs_f64(),
                wall_time,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(SandboxRunResult {
                outcome: RunOutcome::TimedOut,
                exit_code: None,
                stdout: String::new(),
                stderr: "wall-clock timeout".to_string(),
                peak_memory_bytes: 0,
                cpu_seconds: wall_time.as_secs_f64(),
                wall_time,
            }),
        }
    }

    async fn destroy_sandbox(&self, sandbox: SandboxHandle) -> std::io::Result<()> {
        let dir = self.scratch_root.join(format!("runtime-{}", sandbox.id));
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Score deduction per violation category: a fixed policy table, degraded by
/// each category of violation rather than computed from a formula.
fn score_for_outcome(outcome: RunOutcome) -> f64 {
    match outcome {
        RunOutcome::CompletedCleanly => 100.0,
        RunOutcome::NonZeroExit => 70.0,
        RunOutcome::Panicked => 40.0,
        RunOutcome::TimedOut => 20.0,
        RunOutcome::OutOfMemory => 10.0,
    }
}

fn build_recipe_for(codebase: &Codebase) -> Option<&'static str> {
    if codebase.languages.contains("go") {
        Some("go run .")
    } else if codebase.languages.contains("python") {
        Some("python3 main.py")
    } else if codebase.languages.contains("javascript") {
        Some("node index.js")
    } else {
        None
    }
}

/// The runtime-analysis engine: runs a codebase inside a sandbox and
/// observes its behavior, as opposed to the static engine's read-only
/// inspection.
pub struct RuntimeEngine {
    sandbox: Arc<dyn SandboxProvider>,
    limits: SandboxLimits,
}

impl RuntimeEngine {
    pub fn new(sandbox: Arc<dyn SandboxProvider>, limits: SandboxLimits) -> Self {
        Self { sandbox, limits }
    }
}

#[async_trait]
impl Engine for RuntimeEngine {
    fn name(&self) -> &str {
        "runtime"
    }

    fn supported_languages(&self) -> &[&str] {
        &["go", "python", "javascript"]
    }

    async fn validate(
        &self,
        ctx: &EngineContext,
        codebase: &Codebase,
        _config: &ValidationConfig,
    ) -> Result<EngineResult> {
        let start = Instant::now();

        if ctx.is_cancelled() {
            return Ok(EngineResult::failed(self.name(), "cancelled", start.elapsed()));
        }

        let Some(recipe) = build_recipe_for(codebase) else {
            return Ok(EngineResult::completed(self.name(), 100.0, start.elapsed()));
        };

        // Lifecycle: acquire -> copy-in -> exec -> release, with release
        // guaranteed on every exit path including early returns below.
        let sandbox = match self.sandbox.create_sandbox(&self.limits).await {
            Ok(handle) => handle,
            Err(e) => {
                return Ok(EngineResult::failed(
                    self.name(),
                    format!("failed to acquire sandbox: {e}"),
                    start.elapsed(),
                ));
            }
        };

        let run_result = self.run_in_sandbox(&sandbox, codebase, recipe, ctx).await;

        if let Err(e) = self.sandbox.destroy_sandbox(sandbox).await {
            warn!("failed to release sandbox: {e}");
        }

        let run_result = match run_result {
            Ok(r) => r,
            Err(e) => {
                return Ok(EngineResult::failed(self.name(), e.to_string(), start.elapsed()));
            }
        };

        let score = score_for_outcome(run_result.outcome);

        let mut findings = Vec::new();
        match run_result.outcome {
            RunOutcome::CompletedCleanly => {}
            RunOutcome::NonZeroExit => findings.push(Finding::new(
                "runtime",
                Severity::Medium,
                "program exited non-zero",
                format!("Exit code {:?}. stderr: {}", run_result.exit_code, run_result.stderr),
            )),
            RunOutcome::Panicked => findings.push(Finding::new(
                "runtime",
                Severity::High,
                "program panicked",
                run_result.stderr.clone(),
            )),
            RunOutcome::OutOfMemory => findings.push(Finding::new(
                "runtime",
                Severity::Critical,
                "sandbox terminated: out of memory",
                format!("peak memory {} bytes exceeded limit", run_result.peak_memory_bytes),
            )),
            RunOutcome::TimedOut => findings.push(Finding::new(
                "runtime",
                Severity::High,
                "sandbox terminated: wall-clock timeout",
                format!("exceeded {:?}", self.limits.wall_clock),
            )),
        }

        let mut metrics = HashMap::new();
        metrics.insert(
            "peak_memory_bytes".to_string(),
            serde_json::to_value(run_result.peak_memory_bytes)?,
        );
        metrics.insert(
            "cpu_seconds".to_string(),
            serde_json::to_value(run_result.cpu_seconds)?,
        );
        metrics.insert(
            "wall_time_ms".to_string(),
            serde_json::to_value(run_result.wall_time.as_millis() as u64)?,
        );
        metrics.insert("outcome".to_string(), serde_json::to_value(run_result.outcome)?);

        Ok(EngineResult::completed(self.name(), score, start.elapsed())
            .with_findings(findings)
            .with_metrics(metrics))
    }
}

impl RuntimeEngine {
    async fn run_in_sandbox(
        &self,
        sandbox: &SandboxHandle,
        codebase: &Codebase,
        recipe: &str,
        ctx: &EngineContext,
    ) -> std::io::Result<SandboxRunResult> {
        self.sandbox.copy_in(sandbox, codebase).await?;
        if ctx.is_cancelled() {
            return Ok(SandboxRunResult {
                outcome: RunOutcome::TimedOut,
                exit_code: None,
                stdout: String::new(),
                stderr: "cancelled before exec".to_string(),
                peak_memory_bytes: 0,
                cpu_seconds: 0.0,
                wall_time: Duration::ZERO,
            });
        }
        self.sandbox.exec(sandbox, recipe).await
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeSandboxProvider;
    use super::*;
    use crate::core::codebase::{CodebaseSource, File};
    use tokio_util::sync::CancellationToken;

    fn ctx() -> EngineContext {
        EngineContext {
            cancellation: CancellationToken::new(),
            task_id: "task-1".to_string(),
            budget: Duration::from_secs(30),
        }
    }

    fn go_codebase() -> Codebase {
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", b"package main\n\nfunc main() {}\n".to_vec()).unwrap())
            .unwrap();
        cb
    }

    #[tokio::test]
    async fn clean_completion_scores_one_hundred() {
        let provider = FakeSandboxProvider::new(SandboxRunResult {
            outcome: RunOutcome::CompletedCleanly,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            peak_memory_bytes: 1024,
            cpu_seconds: 0.1,
            wall_time: Duration::from_millis(50),
        });
        let engine = RuntimeEngine::new(Arc::new(provider), SandboxLimits::default());
        let result = engine
            .validate(&ctx(), &go_codebase(), &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.score, Some(100.0));
        assert!(result.findings.is_empty());
    }

    #[tokio::test]
    async fn oom_scores_ten_and_emits_critical_finding() {
        let provider = FakeSandboxProvider::new(SandboxRunResult {
            outcome: RunOutcome::OutOfMemory,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            peak_memory_bytes: 600_000_000,
            cpu_seconds: 1.0,
            wall_time: Duration::from_secs(5),
        });
        let engine = RuntimeEngine::new(Arc::new(provider), SandboxLimits::default());
        let result = engine
            .validate(&ctx(), &go_codebase(), &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.score, Some(10.0));
        assert_eq!(result.findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn unsupported_language_completes_without_sandboxing() {
        let provider = FakeSandboxProvider::new(SandboxRunResult {
            outcome: RunOutcome::CompletedCleanly,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            peak_memory_bytes: 0,
            cpu_seconds: 0.0,
            wall_time: Duration::ZERO,
        });
        let engine = RuntimeEngine::new(Arc::new(provider), SandboxLimits::default());
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("README.md", b"# hi\n".to_vec()).unwrap())
            .unwrap();
        let result = engine
            .validate(&ctx(), &cb, &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.score, Some(100.0));
    }
}
