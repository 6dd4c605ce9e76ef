//! Performance Engine contract stub.
//! Flags files whose size suggests a maintainability/perf risk (very large
//! single files) rather than running real benchmarks, which belong to the
//! runtime engine's sandboxed execution path.

use std::time::Instant;

use async_trait::async_trait;

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::errors::Result;
use crate::core::finding::{Finding, Severity};
use crate::core::task::EngineResult;
use crate::engine::contract::{Engine, EngineContext};

/// Files with more lines than this are flagged as a performance-adjacent
/// risk (harder to profile, more likely to hide hot loops).
const LARGE_FILE_LINE_THRESHOLD: usize = 2000;

pub struct PerformanceEngine;

#[async_trait]
impl Engine for PerformanceEngine {
    fn name(&self) -> &str {
        "performance"
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

        let mut findings = Vec::new();
        for file in &codebase.files {
            if ctx.is_cancelled() {
                return Ok(EngineResult::failed(self.name(), "cancelled", start.elapsed()));
            }
            if file.line_count > LARGE_FILE_LINE_THRESHOLD {
                findings.push(
                    Finding::new(
                        "performance",
                        Severity::Low,
                        "oversized source file",
                        format!("{} has {} lines, above the {LARGE_FILE_LINE_THRESHOLD}-line threshold", file.path, file.line_count),
                    )
                    .at(file.path.clone(), 1)
                    .with_category("file_size"),
                );
            }
        }

        let score = (100.0 - findings.len() as f64 * Severity::Low.default_penalty()).clamp(0.0, 100.0);
        Ok(EngineResult::completed(self.name(), score, start.elapsed()).with_findings(findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codebase::{CodebaseSource, File};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> EngineContext {
        EngineContext {
            cancellation: CancellationToken::new(),
            task_id: "task-1".to_string(),
            budget: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn small_codebase_scores_one_hundred() {
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", b"package main\n".to_vec()).unwrap())
            .unwrap();
        let engine = PerformanceEngine;
        let result = engine
            .validate(&ctx(), &cb, &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.score, Some(100.0));
    }

    #[tokio::test]
    async fn oversized_file_is_flagged() {
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        let big = "x\n".repeat(LARGE_FILE_LINE_THRESHOLD + 1);
        cb.add_file(File::new("huge.go", big.into_bytes()).unwrap())
            .unwrap();
        let engine = PerformanceEngine;
        let result = engine
            .validate(&ctx(), &cb, &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.score, Some(99.0));
    }
}
