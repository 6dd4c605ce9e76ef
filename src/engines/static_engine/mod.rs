//! Static-Analysis Engine: language survey, lint fan-out,
//! AST complexity analysis, file-level metrics, and scoring — all driven
//! through the shared [`Engine`] contract.

pub mod ast_complexity;
pub mod file_metrics;
pub mod linters;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::errors::Result;
use crate::core::finding::{Finding, Severity};
use crate::core::task::EngineResult;
use crate::engine::contract::{Engine, EngineContext, HealthStatus};
use crate::engine::tool::ExternalToolAdapter;

use ast_complexity::analyze_go_source;
use file_metrics::{compute_code_metrics, maintainability_score};
use linters::{run_lint_fanout, ScratchDir, LINTERS};

/// Functions with cyclomatic complexity above this threshold are reported as
/// findings and drag the overall engine score down.
const COMPLEXITY_FINDING_THRESHOLD: u32 = 10;
const COMPLEXITY_SCORE_PENALTY: f64 = 10.0;
const MAINTAINABILITY_SCORE_PENALTY: f64 = 15.0;
const MAINTAINABILITY_PENALTY_THRESHOLD: f64 = 60.0;

/// The static-analysis engine: lints, parses, and measures a codebase
/// without executing any of its code.
pub struct StaticEngine {
    tool: Arc<dyn ExternalToolAdapter>,
}

impl StaticEngine {
    pub fn new(tool: Arc<dyn ExternalToolAdapter>) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Engine for StaticEngine {
    fn name(&self) -> &str {
        "static"
    }

    fn supported_languages(&self) -> &[&str] {
        &["go", "python", "javascript", "typescript"]
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

        // Step 1: language survey.
        let stats = codebase.stats();
        let languages: HashMap<String, usize> = stats.per_language.clone();
        info!(task_id = %ctx.task_id, languages = ?languages, "static engine: language survey complete");

        // Step 2: lint fan-out.
        let scratch = ScratchDir::create(&ctx.task_id, self.name())?;
        let lint_outcome = if ctx.is_cancelled() {
            None
        } else {
            match run_lint_fanout(codebase, &scratch, self.tool.as_ref(), ctx.budget).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!("lint fan-out failed entirely: {e}");
                    None
                }
            }
        };
        let mut findings: Vec<Finding> = lint_outcome
            .as_ref()
            .map(|o| o.findings.clone())
            .unwrap_or_default();
        let linters_run: Vec<String> = lint_outcome
            .map(|o| o.linters_run)
            .unwrap_or_default();

        if ctx.is_cancelled() {
            return Ok(EngineResult::failed(self.name(), "cancelled", start.elapsed()));
        }

        // Step 3: AST complexity analysis (Go only — the sole embedded grammar).
        let mut complexities = Vec::new();
        for file in codebase.files_by_language("go") {
            if ctx.is_cancelled() {
                return Ok(EngineResult::failed(self.name(), "cancelled", start.elapsed()));
            }
            match analyze_go_source(&file.path, &file.text()) {
                Ok(functions) => complexities.extend(functions),
                Err(e) => warn!("AST analysis failed for {}: {e}", file.path),
            }
        }

        for function in &complexities {
            if function.complexity > COMPLEXITY_FINDING_THRESHOLD {
                findings.push(
                    Finding::new(
                        "complexity",
                        Severity::Medium,
                        "High Cyclomatic Complexity",
                        format!(
                            "Function `{}` in {} spans lines {}-{} with {} parameters and cyclomatic complexity {}, above the threshold of {}.",
                            function.name,
                            function.file,
                            function.start_line,
                            function.end_line,
                            function.parameter_count,
                            function.complexity,
                            COMPLEXITY_FINDING_THRESHOLD,
                        ),
                    )
                    .at(function.file.clone(), function.start_line)
                    .with_category("complexity"),
                );
            }
        }

        let avg_complexity = if complexities.is_empty() {
            0.0
        } else {
            complexities.iter().map(|f| f.complexity as f64).sum::<f64>() / complexities.len() as f64
        };

        // Step 4: file-level metrics.
        let code_metrics = compute_code_metrics(codebase);
        let maintainability = maintainability_score(&code_metrics);

        // Step 5: scoring.
        let mut score = 100.0;
        for finding in &findings {
            score -= finding.severity.default_penalty();
        }
        if avg_complexity > COMPLEXITY_FINDING_THRESHOLD as f64 {
            score -= COMPLEXITY_SCORE_PENALTY;
        }
        if maintainability < MAINTAINABILITY_PENALTY_THRESHOLD {
            score -= MAINTAINABILITY_SCORE_PENALTY;
        }
        score = score.clamp(0.0, 100.0);

        let mut metrics = HashMap::new();
        metrics.insert("languages".to_string(), serde_json::to_value(&languages)?);
        metrics.insert(
            "complexity_by_function".to_string(),
            serde_json::to_value(&complexities)?,
        );
        metrics.insert("code_metrics".to_string(), serde_json::to_value(&code_metrics)?);
        metrics.insert(
            "maintainability".to_string(),
            serde_json::to_value(maintainability)?,
        );
        metrics.insert("linters_run".to_string(), serde_json::to_value(&linters_run)?);
        metrics.insert(
            "average_complexity".to_string(),
            serde_json::to_value(avg_complexity)?,
        );

        Ok(EngineResult::completed(self.name(), score, start.elapsed())
            .with_findings(findings)
            .with_metrics(metrics))
    }

    async fn health_check(&self) -> HealthStatus {
        let mut missing = Vec::new();
        for linter in LINTERS {
            if !self.tool.is_available(linter.command).await {
                missing.push(linter.command.to_string());
            }
        }
        if missing.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy { missing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codebase::{CodebaseSource, File};
    use crate::engine::tool::fakes::FakeToolAdapter;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> EngineContext {
        EngineContext {
            cancellation: CancellationToken::new(),
            task_id: "task-1".to_string(),
            budget: Duration::from_secs(30),
        }
    }

    fn go_codebase_with_complex_function() -> Codebase {
        let mut body = String::new();
        for i in 0..12 {
            body.push_str(&format!("if x > {i} {{\n"));
        }
        for _ in 0..12 {
            body.push_str("}\n");
        }
        let source = format!("package main\n\nfunc f(x int) {{\n{body}}}\n");

        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", source.into_bytes()).unwrap())
            .unwrap();
        cb
    }

    #[tokio::test]
    async fn complex_function_yields_finding_and_lower_score() {
        let engine = StaticEngine::new(Arc::new(FakeToolAdapter::default()));
        let codebase = go_codebase_with_complex_function();
        let config = ValidationConfig::default();
        let result = engine.validate(&ctx(), &codebase, &config).await.unwrap();

        assert!(result
            .findings
            .iter()
            .any(|f| f.finding_type == "complexity"));
        assert!(result.score.unwrap() < 100.0);
    }

    #[tokio::test]
    async fn cancelled_context_returns_failed_result() {
        let engine = StaticEngine::new(Arc::new(FakeToolAdapter::default()));
        let mut call_ctx = ctx();
        call_ctx.cancellation.cancel();
        let codebase = go_codebase_with_complex_function();
        let config = ValidationConfig::default();
        let result = engine.validate(&call_ctx, &codebase, &config).await.unwrap();

        assert_eq!(result.status, crate::core::task::EngineStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn simple_codebase_scores_near_perfect() {
        let engine = StaticEngine::new(Arc::new(FakeToolAdapter::default()));
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(
            File::new(
                "main.go",
                b"package main\n\n// entry point\nfunc main() {\n\tprintln(\"hi\")\n}\n".to_vec(),
            )
            .unwrap(),
        )
        .unwrap();
        let config = ValidationConfig::default();
        let result = engine.validate(&ctx(), &cb, &config).await.unwrap();

        assert_eq!(result.score, Some(100.0));
        assert!(result.findings.is_empty());
    }

    #[tokio::test]
    async fn health_check_reports_missing_linters() {
        let engine = StaticEngine::new(Arc::new(FakeToolAdapter::default()));
        let status = engine.health_check().await;
        assert!(matches!(status, HealthStatus::Unhealthy { .. }));
    }
}
