//! Lint fan-out: materialize relevant files into a
//! scratch directory, invoke each applicable external linter, parse its
//! output into [`Finding`]s. A single linter's failure is logged and
//! contributes zero findings; it never aborts the engine.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::core::codebase::Codebase;
use crate::core::errors::Result;
use crate::core::finding::{Finding, Severity};
use crate::engine::tool::ExternalToolAdapter;

/// Descriptor for a linter this engine knows how to shell out to.
pub struct LinterSpec {
    pub name: &'static str,
    pub command: &'static str,
    pub args: &'static [&'static str],
    pub languages: &'static [&'static str],
}

/// Closed table of linters the static engine may invoke, keyed by the
/// languages they cover: each entry names the binary on PATH and the flag
/// that switches it to JSON output.
pub const LINTERS: &[LinterSpec] = &[
    LinterSpec {
        name: "golangci-lint",
        command: "golangci-lint",
        args: &["run", "--out-format", "json"],
        languages: &["go"],
    },
    LinterSpec {
        name: "ruff",
        command: "ruff",
        args: &["check", "--output-format", "json"],
        languages: &["python"],
    },
    LinterSpec {
        name: "eslint",
        command: "eslint",
        args: &[".", "-f", "json"],
        languages: &["javascript", "typescript"],
    },
];

/// A generic, linter-agnostic finding row that individual linters' JSON
/// output is expected to fit (best-effort parsing: malformed output is
/// treated exactly like a linter failure — zero findings, no abort).
#[derive(Debug, serde::Deserialize)]
struct RawFinding {
    file: String,
    line: Option<usize>,
    column: Option<usize>,
    message: String,
    rule: Option<String>,
    severity: Option<String>,
}

fn severity_from_str(s: Option<&str>) -> Severity {
    match s.map(str::to_ascii_lowercase).as_deref() {
        Some("critical") => Severity::Critical,
        Some("high") | Some("error") => Severity::High,
        Some("medium") | Some("warning") | Some("warn") => Severity::Medium,
        Some("low") => Severity::Low,
        _ => Severity::Info,
    }
}

/// A scratch directory scoped to one engine invocation. Removed on drop so
/// every exit path, including panics and cancellation, cleans up.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a uniquely-named scratch directory under the system temp dir,
    /// named `task-id + engine-name + random suffix`.
    pub fn create(task_id: &str, engine_name: &str) -> Result<Self> {
        let suffix = Uuid::new_v4().simple().to_string();
        let path = std::env::temp_dir().join(format!("forgeguard-{task_id}-{engine_name}-{suffix}"));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a file's bytes into the scratch root, rejecting any path that
    /// would escape it via `..` components or an absolute prefix.
    pub fn materialize(&self, relative_path: &str, content: &[u8]) -> Result<()> {
        let rel = Path::new(relative_path);
        if rel.is_absolute() || rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(crate::core::errors::ValidationError::config(format!(
                "refusing to materialize unsafe path: {relative_path}"
            )));
        }
        let target = self.path.join(rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&target)?.permissions();
            perms.set_mode(0o644);
            std::fs::set_permissions(&target, perms)?;
        }
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove scratch dir {}: {e}", self.path.display());
            }
        }
    }
}

/// Result of the lint fan-out: collected findings plus whether at least one
/// linter ran to completion. A fatal linter-invocation error propagates only
/// if no linter succeeded at all; otherwise it's logged and skipped.
pub struct LintOutcome {
    pub findings: Vec<Finding>,
    pub any_linter_succeeded: bool,
    pub linters_run: Vec<String>,
}

/// Run every linter whose language set intersects the codebase's detected
/// languages, against a scratch-materialized copy of its source files.
pub async fn run_lint_fanout(
    codebase: &Codebase,
    scratch: &ScratchDir,
    tool: &dyn ExternalToolAdapter,
    deadline: Duration,
) -> Result<LintOutcome> {
    let detected: HashSet<&str> = codebase.languages.iter().map(String::as_str).collect();
    let mut findings = Vec::new();
    let mut any_succeeded = false;
    let mut linters_run = Vec::new();

    for linter in LINTERS {
        if !linter.languages.iter().any(|l| detected.contains(l)) {
            continue;
        }

        for file in codebase
            .files
            .iter()
            .filter(|f| linter.languages.iter().any(|l| f.language.as_deref() == Some(l)))
        {
            if let Err(e) = scratch.materialize(&file.path, &file.content) {
                warn!("failed to materialize {} for {}: {e}", file.path, linter.name);
            }
        }

        if !tool.is_available(linter.command).await {
            warn!("linter '{}' not found on PATH; skipping", linter.command);
            continue;
        }

        linters_run.push(linter.name.to_string());
        match tool
            .run(linter.command, linter.args, scratch.path(), None, deadline)
            .await
        {
            Ok(output) => {
                any_succeeded = true;
                match serde_json::from_str::<Vec<RawFinding>>(&output.stdout) {
                    Ok(raw_findings) => {
                        info!("{} reported {} findings", linter.name, raw_findings.len());
                        for raw in raw_findings {
                            let mut finding = Finding::new(
                                "code_quality",
                                severity_from_str(raw.severity.as_deref()),
                                raw.message.clone(),
                                raw.message,
                            )
                            .with_category(linter.name);
                            finding.file = Some(raw.file);
                            finding.line = raw.line;
                            finding.column = raw.column;
                            if let Some(rule) = raw.rule {
                                finding = finding.with_rule(rule);
                            }
                            findings.push(finding);
                        }
                    }
                    Err(e) => {
                        warn!("{} produced unparseable output: {e}", linter.name);
                    }
                }
            }
            Err(e) => {
                warn!("{} failed to run: {e}", linter.name);
            }
        }
    }

    Ok(LintOutcome {
        findings,
        any_linter_succeeded: any_succeeded,
        linters_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codebase::{CodebaseSource, File};
    use crate::engine::tool::fakes::FakeToolAdapter;
    use crate::engine::tool::ToolOutput;

    fn go_codebase() -> Codebase {
        let mut cb = Codebase::new("cb", "demo", CodebaseSource::Inline);
        cb.add_file(File::new("main.go", b"package main\n\nfunc main() {}\n".to_vec()).unwrap())
            .unwrap();
        cb
    }

    #[test]
    fn scratch_dir_rejects_path_traversal() {
        let scratch = ScratchDir::create("t1", "static").unwrap();
        let result = scratch.materialize("../escape.txt", b"evil");
        assert!(result.is_err());
    }

    #[test]
    fn scratch_dir_cleans_up_on_drop() {
        let path = {
            let scratch = ScratchDir::create("t2", "static").unwrap();
            scratch.materialize("main.go", b"package main\n").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unavailable_linter_is_skipped_without_failing() {
        let codebase = go_codebase();
        let scratch = ScratchDir::create("t3", "static").unwrap();
        let fake = FakeToolAdapter::default();
        let outcome = run_lint_fanout(&codebase, &scratch, &fake, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(outcome.findings.is_empty());
        assert!(!outcome.any_linter_succeeded);
    }

    #[tokio::test]
    async fn successful_linter_contributes_findings() {
        let codebase = go_codebase();
        let scratch = ScratchDir::create("t4", "static").unwrap();
        let fake = FakeToolAdapter::default();
        fake.available
            .lock()
            .unwrap()
            .insert("golangci-lint".to_string(), true);
        fake.outputs.lock().unwrap().insert(
            "golangci-lint".to_string(),
            ToolOutput {
                stdout: r#"[{"file":"main.go","line":1,"column":1,"message":"unused import","rule":"unused","severity":"medium"}]"#.to_string(),
                stderr: String::new(),
                exit_code: Some(1),
            },
        );

        let outcome = run_lint_fanout(&codebase, &scratch, &fake, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert!(outcome.any_linter_succeeded);
        assert_eq!(outcome.findings[0].rule_id.as_deref(), Some("unused"));
    }

    #[tokio::test]
    async fn malformed_output_contributes_zero_findings_without_failing() {
        let codebase = go_codebase();
        let scratch = ScratchDir::create("t5", "static").unwrap();
        let fake = FakeToolAdapter::default();
        fake.available
            .lock()
            .unwrap()
            .insert("golangci-lint".to_string(), true);
        fake.outputs.lock().unwrap().insert(
            "golangci-lint".to_string(),
            ToolOutput {
                stdout: "not json".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            },
        );

        let outcome = run_lint_fanout(&codebase, &scratch, &fake, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(outcome.findings.is_empty());
        assert!(outcome.any_linter_succeeded);
    }
}
