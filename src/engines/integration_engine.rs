//! Integration Engine contract stub.
//! Checks for the presence of test files per detected language rather than
//! actually executing a test suite, which would require the same sandbox
//! substrate as the runtime engine.

use std::time::Instant;

use async_trait::async_trait;

use crate::core::codebase::Codebase;
use crate::core::config::ValidationConfig;
use crate::core::errors::Result;
use crate::core::finding::{Finding, Severity};
use crate::core::task::EngineResult;
use crate::engine::contract::{Engine, EngineContext};

pub struct IntegrationEngine;

#[async_trait]
impl Engine for IntegrationEngine {
    fn name(&self) -> &str {
        "integration"
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

        let source_count = codebase
            .files_by_class(crate::core::codebase::FileClass::Source)
            .count();
        let test_count = codebase.files.iter().filter(|f| f.is_test).count();

        let mut findings = Vec::new();
        let score = if source_count == 0 {
            100.0
        } else if test_count == 0 {
            findings.push(Finding::new(
                "integration",
                Severity::Medium,
                "no test files found",
                format!("{source_count} source file(s) detected with zero associated test files"),
            ));
            60.0
        } else {
            let ratio = test_count as f64 / source_count as f64;
            (70.0 + 30.0 * ratio.min(1.0)).clamp(0.0, 100.0)
        };

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
    async fn missing_tests_yields_medium_finding() {
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", b"package main\n".to_vec()).unwrap())
            .unwrap();
        let engine = IntegrationEngine;
        let result = engine
            .validate(&ctx(), &cb, &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.score, Some(60.0));
        assert_eq!(result.findings.len(), 1);
    }

    #[tokio::test]
    async fn full_test_coverage_scores_one_hundred() {
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", b"package main\n".to_vec()).unwrap())
            .unwrap();
        cb.add_file(File::new("main_test.go", b"package main\n".to_vec()).unwrap())
            .unwrap();
        let engine = IntegrationEngine;
        let result = engine
            .validate(&ctx(), &cb, &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.score, Some(100.0));
        assert!(result.findings.is_empty());
    }
}
