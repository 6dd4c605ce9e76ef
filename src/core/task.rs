//! Task lifecycle and result types: `Task`, `EngineResult`, and
//! `ValidationResult`, plus the derived `Summary`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::finding::Finding;

/// Task priority. Advisory only; the orchestrator's queue is plain FIFO
/// — priority is carried for downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    /// Terminal states are sticky: once reached, a task never leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::TimedOut
        )
    }
}

/// One user submission: a codebase, a config, an identity, and a lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Globally unique, opaque id.
    pub id: String,
    /// Task-type tag (free-form; "validation" by default).
    pub task_type: String,
    /// The codebase to validate.
    pub codebase: Codebase,
    /// Validation configuration.
    pub config: ValidationConfig,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Start timestamp, set when a worker picks the task up.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp, set on terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: TaskStatus,
    /// Priority (advisory).
    pub priority: Priority,
    /// Free-form metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Task {
    /// Construct a new, pending task.
    pub fn new(codebase: Codebase, config: ValidationConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_type: "validation".to_string(),
            codebase,
            config,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            status: TaskStatus::Pending,
            priority: Priority::Normal,
            metadata: HashMap::new(),
        }
    }
}

/// Status of a single engine's contribution to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Running,
    Completed,
    Failed,
}

/// Per-engine bundle of status, score, duration, findings, and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResult {
    /// Engine name.
    pub engine: String,
    /// Status of this engine's run.
    pub status: EngineStatus,
    /// Numeric score in `[0, 100]`, present only when `status == Completed`.
    pub score: Option<f64>,
    /// Wall-clock duration of the engine call.
    pub duration: Duration,
    /// Findings emitted.
    pub findings: Vec<Finding>,
    /// Opaque metrics map.
    pub metrics: HashMap<String, serde_json::Value>,
    /// Error string, present only when `status == Failed`.
    pub error: Option<String>,
}

impl EngineResult {
    /// Build a completed result.
    pub fn completed(engine: impl Into<String>, score: f64, duration: Duration) -> Self {
        Self {
            engine: engine.into(),
            status: EngineStatus::Completed,
            score: Some(score.clamp(0.0, 100.0)),
            duration,
            findings: Vec::new(),
            metrics: HashMap::new(),
            error: None,
        }
    }

    /// Build a failed result.
    pub fn failed(engine: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            engine: engine.into(),
            status: EngineStatus::Failed,
            score: None,
            duration,
            findings: Vec::new(),
            metrics: HashMap::new(),
            error: Some(error.into()),
        }
    }

    /// Attach findings.
    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    /// Attach metrics.
    pub fn with_metrics(mut self, metrics: HashMap<String, serde_json::Value>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Derived, human-facing summary of a [`ValidationResult`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// File count per detected language.
    pub languages: HashMap<String, usize>,
    /// Total lines of code analyzed.
    pub total_lines: usize,
    /// Quality sub-score (mirrors the static engine's score, if present).
    pub quality_score: Option<f64>,
    /// Maintainability sub-score, taken from `metrics.maintainability` if present.
    pub maintainability_score: Option<f64>,
    /// Security sub-score, taken from the security engine's score if present.
    pub security_score: Option<f64>,
    /// Performance sub-score, taken from the performance engine's score if present.
    pub performance_score: Option<f64>,
    /// Human-readable recommendations derived from findings.
    pub recommendations: Vec<String>,
}

/// Task-level aggregate over all `EngineResult`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Id of the task this result belongs to.
    pub task_id: String,
    /// Mirrors the task's terminal (or interim) status.
    pub status: TaskStatus,
    /// Weighted overall score in `[0, 100]`.
    pub overall_score: f64,
    /// Quality-gate decision.
    pub quality_gate: bool,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Total duration, once terminal.
    pub duration: Option<Duration>,
    /// Per-engine results, keyed by engine name.
    pub engine_results: HashMap<String, EngineResult>,
    /// Derived summary.
    pub summary: Summary,
    /// Top-level errors (e.g. `EXECUTION_ERROR`).
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Build an interim (running) snapshot with no engine results yet.
    pub fn interim(task_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Running,
            overall_score: 0.0,
            quality_gate: false,
            started_at: Some(started_at),
            completed_at: None,
            duration: None,
            engine_results: HashMap::new(),
            summary: Summary::default(),
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_sticky_by_flag() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(TaskStatus::TimedOut.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
    }

    #[test]
    fn engine_result_clamps_score() {
        let result = EngineResult::completed("static", 150.0, Duration::from_millis(5));
        assert_eq!(result.score, Some(100.0));
    }
}
