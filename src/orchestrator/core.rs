//! Orchestrator Core: bounded task queue, fixed worker pool, per-task
//! engine fan-out, aggregation, and graceful shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::errors::{Result, ValidationError};
use crate::core::task::{EngineResult, Task, TaskStatus, ValidationResult};
use crate::engine::contract::EngineContext;
use crate::engine::registry::EngineRegistry;
use crate::orchestrator::aggregate::{derive_summary, quality_gate_passes, weighted_overall_score};
use crate::orchestrator::store::ResultStore;

/// Tunables governing queue depth and worker concurrency.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub queue_capacity: usize,
    pub worker_count: usize,
    pub result_store_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            worker_count: 5,
            result_store_capacity: 10_000,
        }
    }
}

/// Overall liveness category returned by [`Orchestrator::health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Stopped,
}

/// Snapshot of internal orchestrator liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthState,
    pub running: bool,
    pub worker_count: usize,
    pub queue_len: usize,
    pub queue_cap: usize,
    pub stored_results: usize,
    pub engine_count: usize,
}

struct QueuedTask {
    task: Task,
}

/// The validation orchestrator: queue, workers, registry, and result store
/// bound together. Construct with [`Orchestrator::new`], then
/// [`Orchestrator::start`] before calling [`Orchestrator::submit`].
pub struct Orchestrator {
    settings: OrchestratorSettings,
    registry: Arc<EngineRegistry>,
    store: Arc<ResultStore>,
    sender: mpsc::Sender<QueuedTask>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<QueuedTask>>>,
    running: AtomicBool,
    shutdown: CancellationToken,
    workers: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<EngineRegistry>, settings: OrchestratorSettings) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        Arc::new(Self {
            store: Arc::new(ResultStore::new(settings.result_store_capacity)),
            settings,
            registry,
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            workers: AsyncMutex::new(Vec::new()),
        })
    }

    /// Spawn the fixed worker pool. Idempotent only in the sense that
    /// calling it twice spawns a second pool sharing the same queue; callers
    /// should call it exactly once.
    pub async fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        let mut workers = self.workers.lock().await;
        for worker_id in 0..self.settings.worker_count {
            let orchestrator = Arc::clone(self);
            workers.push(tokio::spawn(async move {
                orchestrator.worker_loop(worker_id).await;
            }));
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!(worker_id, "worker started");
        loop {
            let queued = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(worker_id, "worker observed shutdown signal");
                    None
                }
                received = async {
                    let mut receiver = self.receiver.lock().await;
                    receiver.recv().await
                } => received,
            };

            let Some(queued) = queued else {
                break;
            };

            self.process_task(queued.task).await;
        }
        debug!(worker_id, "worker exited");
    }

    /// `Submit(codebase, config) -> Task | Error`. Validates the codebase,
    /// creates a fresh pending task, then attempts a non-blocking enqueue.
    pub async fn submit(&self, codebase: Codebase, config: ValidationConfig) -> Result<Task> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ValidationError::NotRunning);
        }
        codebase.validate()?;
        config.validate()?;

        let mut task = Task::new(codebase, config);
        match self.sender.try_send(QueuedTask { task: task.clone() }) {
            Ok(()) => {
                task.status = TaskStatus::Queued;
                info!(task_id = %task.id, "task queued");
                Ok(task)
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(ValidationError::QueueFull {
                capacity: self.settings.queue_capacity,
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ValidationError::NotRunning),
        }
    }

    /// `Query(task_id) -> ValidationResult | NotFound`.
    pub fn query(&self, task_id: &str) -> Result<ValidationResult> {
        self.store.get(task_id)
    }

    /// `List(status?, limit?) -> [ValidationResult]`.
    pub fn list(&self, status: Option<TaskStatus>, limit: Option<usize>) -> Vec<ValidationResult> {
        self.store.list(status, limit)
    }

    fn effective_engines(&self, config: &ValidationConfig) -> Vec<String> {
        let known: Vec<String> = config
            .enabled_engines
            .iter()
            .filter(|name| self.registry.contains(name))
            .cloned()
            .collect();
        if known.is_empty() {
            vec!["static".to_string()]
        } else {
            known
        }
    }

    async fn process_task(&self, mut task: Task) {
        task.status = TaskStatus::Running;
        task.started_at = Some(Utc::now());
        let started_at = task.started_at.unwrap();

        let interim = ValidationResult::interim(&task.id, started_at);
        if let Err(e) = self.store.put(interim) {
            warn!("failed to store interim snapshot for {}: {e}", task.id);
        }

        let engines = self.effective_engines(&task.config);
        let codebase = Arc::new(task.codebase.clone());
        let config = Arc::new(task.config.clone());
        let timeout = task.config.timeout();

        let task_cancellation = self.shutdown.child_token();
        let deadline_timer = {
            let token = task_cancellation.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        };

        let mut engine_results: HashMap<String, EngineResult> = HashMap::new();
        let parallel = task.config.parallel;

        if parallel {
            let futures = engines.iter().map(|name| {
                self.run_one_engine(name, &task_cancellation, &task.id, timeout, &codebase, &config)
            });
            let results = futures::future::join_all(futures).await;
            for (name, result) in engines.iter().zip(results) {
                engine_results.insert(name.clone(), result);
            }
        } else {
            for name in &engines {
                let result = self
                    .run_one_engine(name, &task_cancellation, &task.id, timeout, &codebase, &config)
                    .await;
                engine_results.insert(name.clone(), result);
            }
        }

        deadline_timer.abort();
        let deadline_fired = task_cancellation.is_cancelled();
        task_cancellation.cancel();

        let any_completed = engine_results
            .values()
            .any(|r| r.status == crate::core::task::EngineStatus::Completed);
        let any_failed = engine_results
            .values()
            .any(|r| r.status == crate::core::task::EngineStatus::Failed);

        let external_cancel = self.shutdown.is_cancelled();

        // Cancellation (external shutdown or the task's own deadline) takes
        // priority over the generic failure rule: an engine that comes back
        // `Failed` only because its context was cancelled must not masquerade
        // as a genuine `EngineError`.
        let status = if external_cancel {
            TaskStatus::Cancelled
        } else if deadline_fired {
            TaskStatus::TimedOut
        } else if any_failed && !any_completed {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };

        let overall_score = weighted_overall_score(&engine_results, &task.config);
        let gate = quality_gate_passes(overall_score, &engine_results, &task.config);
        let summary = derive_summary(&engine_results);

        let completed_at = Utc::now();
        let mut errors = Vec::new();
        if status == TaskStatus::Failed {
            errors.push("EXECUTION_ERROR".to_string());
        }

        let result = ValidationResult {
            task_id: task.id.clone(),
            status,
            overall_score,
            quality_gate: gate,
            started_at: task.started_at,
            completed_at: Some(completed_at),
            duration: task
                .started_at
                .map(|s| (completed_at - s).to_std().unwrap_or(Duration::ZERO)),
            engine_results,
            summary,
            errors,
        };

        if let Err(e) = self.store.put(result) {
            warn!("failed to store terminal snapshot for {}: {e}", task.id);
        }
    }

    async fn run_one_engine(
        &self,
        name: &str,
        cancellation: &CancellationToken,
        task_id: &str,
        timeout: Duration,
        codebase: &Arc<Codebase>,
        config: &Arc<ValidationConfig>,
    ) -> EngineResult {
        let engine = match self.registry.create(name) {
            Ok(engine) => engine,
            Err(e) => return EngineResult::failed(name, e.to_string(), Duration::ZERO),
        };

        let ctx = EngineContext {
            cancellation: cancellation.clone(),
            task_id: task_id.to_string(),
            budget: timeout,
        };

        match tokio::time::timeout(timeout, engine.validate(&ctx, codebase, config)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => EngineResult::failed(name, e.to_string(), Duration::ZERO),
            Err(_) => EngineResult::failed(name, "cancelled", timeout),
        }
    }

    /// `Stop(ctx)`: flip running to false, signal workers to drain their
    /// current task then exit, and wait up to `deadline` for them to do so.
    pub async fn stop(&self, deadline: Duration) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.cancel();

        let mut workers = self.workers.lock().await;
        let handles = std::mem::take(&mut *workers);
        let join_all = futures::future::join_all(handles.into_iter().map(|h| async move {
            let _ = h.await;
        }));

        if tokio::time::timeout(deadline, join_all).await.is_err() {
            warn!("orchestrator shutdown exceeded deadline; workers may still be draining");
        }
        Ok(())
    }

    /// `Health() -> { status, running, worker_count, queue_len, queue_cap, stored_results, engine_count }`.
    pub fn health(&self) -> Health {
        let running = self.running.load(Ordering::SeqCst);
        let queue_cap = self.settings.queue_capacity;
        let queue_len = queue_cap.saturating_sub(self.sender.capacity());
        let status = if !running {
            HealthState::Stopped
        } else if queue_len as f64 > queue_cap as f64 * 0.8 {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        Health {
            status,
            running,
            worker_count: self.settings.worker_count,
            queue_len,
            queue_cap,
            stored_results: self.store.len(),
            engine_count: self.registry.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codebase::{CodebaseSource, File};
    use crate::engine::registry::EngineMetadata;
    use crate::engines::static_engine::StaticEngine;
    use crate::engine::tool::fakes::FakeToolAdapter;
    use async_trait::async_trait;
    use std::time::Duration as StdDuration;

    fn registry_with_static() -> Arc<EngineRegistry> {
        let mut registry = EngineRegistry::new();
        registry.register(
            "static",
            EngineMetadata {
                name: "static".to_string(),
                description: "static analysis".to_string(),
                supported_languages: vec!["go".to_string()],
            },
            || Arc::new(StaticEngine::new(Arc::new(FakeToolAdapter::default()))),
        );
        Arc::new(registry)
    }

    fn go_codebase() -> Codebase {
        let mut cb = Codebase::new("cb-1", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", b"package main\n\nfunc main() {}\n".to_vec()).unwrap())
            .unwrap();
        cb
    }

    #[tokio::test]
    async fn submit_before_start_fails_not_running() {
        let orchestrator = Orchestrator::new(registry_with_static(), OrchestratorSettings::default());
        let result = orchestrator.submit(go_codebase(), ValidationConfig::default()).await;
        assert!(matches!(result, Err(ValidationError::NotRunning)));
    }

    #[tokio::test]
    async fn submitted_task_eventually_completes() {
        let orchestrator = Orchestrator::new(registry_with_static(), OrchestratorSettings::default());
        orchestrator.start().await;

        let task = orchestrator
            .submit(go_codebase(), ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Queued);

        let mut result = orchestrator.query(&task.id);
        for _ in 0..50 {
            if let Ok(r) = &result {
                if r.status != TaskStatus::Running {
                    break;
                }
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
            result = orchestrator.query(&task.id);
        }

        let result = result.unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
        assert!(result.overall_score > 0.0);
        orchestrator.stop(StdDuration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn queue_full_rejects_submission() {
        let mut settings = OrchestratorSettings::default();
        settings.queue_capacity = 1;
        settings.worker_count = 0;
        let orchestrator = Orchestrator::new(registry_with_static(), settings);
        orchestrator.start().await;

        orchestrator
            .submit(go_codebase(), ValidationConfig::default())
            .await
            .unwrap();
        let second = orchestrator.submit(go_codebase(), ValidationConfig::default()).await;
        assert!(matches!(second, Err(ValidationError::QueueFull { .. })));
    }

    #[tokio::test]
    async fn health_reports_worker_and_engine_counts() {
        let orchestrator = Orchestrator::new(registry_with_static(), OrchestratorSettings::default());
        orchestrator.start().await;
        let health = orchestrator.health();
        assert!(health.running);
        assert_eq!(health.worker_count, 5);
        assert_eq!(health.engine_count, 1);
        orchestrator.stop(StdDuration::from_secs(1)).await.unwrap();
    }

    struct AlwaysFailsEngine;

    #[async_trait]
    impl crate::engine::contract::Engine for AlwaysFailsEngine {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn validate(
            &self,
            _ctx: &EngineContext,
            _codebase: &Codebase,
            _config: &ValidationConfig,
        ) -> Result<EngineResult> {
            Err(ValidationError::engine_error("flaky", "boom"))
        }
    }

    #[tokio::test]
    async fn single_engine_failure_without_success_marks_task_failed() {
        let mut registry = EngineRegistry::new();
        registry.register(
            "flaky",
            EngineMetadata {
                name: "flaky".to_string(),
                description: "always fails".to_string(),
                supported_languages: vec![],
            },
            || Arc::new(AlwaysFailsEngine),
        );
        let orchestrator = Orchestrator::new(Arc::new(registry), OrchestratorSettings::default());
        orchestrator.start().await;

        let mut config = ValidationConfig::default();
        config.enabled_engines = vec!["flaky".to_string()];
        let task = orchestrator.submit(go_codebase(), config).await.unwrap();

        let mut result = orchestrator.query(&task.id);
        for _ in 0..50 {
            if let Ok(r) = &result {
                if r.status.is_terminal() {
                    break;
                }
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
            result = orchestrator.query(&task.id);
        }
        let result = result.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.errors, vec!["EXECUTION_ERROR".to_string()]);
        orchestrator.stop(StdDuration::from_secs(1)).await.unwrap();
    }
}
