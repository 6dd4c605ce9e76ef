//! External tool adapter: a narrow surface the static engine uses to shell
//! out to linters, abstracted so the orchestrator can be exercised in tests
//! with an in-process fake instead of real binaries.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Output of a single external-tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Process exit code, if it ran to completion.
    pub exit_code: Option<i32>,
}

/// Narrow surface for invoking an external tool, so the orchestrator can be
/// exercised in tests with an in-process fake instead of real binaries.
#[async_trait]
pub trait ExternalToolAdapter: Send + Sync {
    /// Run `cmd args...` in `cwd`, optionally feeding `stdin`, aborting if
    /// `deadline` elapses.
    async fn run(
        &self,
        cmd: &str,
        args: &[&str],
        cwd: &Path,
        stdin: Option<&str>,
        deadline: Duration,
    ) -> std::io::Result<ToolOutput>;

    /// Whether `cmd` is discoverable on PATH.
    async fn is_available(&self, cmd: &str) -> bool;
}

/// Production adapter: shells out via [`tokio::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessToolAdapter;

#[async_trait]
impl ExternalToolAdapter for ProcessToolAdapter {
    async fn run(
        &self,
        cmd: &str,
        args: &[&str],
        cwd: &Path,
        stdin: Option<&str>,
        deadline: Duration,
    ) -> std::io::Result<ToolOutput> {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).await?;
            }
        } else {
            drop(child.stdin.take());
        }

        let result = timeout(deadline, child.wait_with_output()).await;
        match result {
            Ok(Ok(output)) => Ok(ToolOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("'{cmd}' did not finish within {deadline:?}"),
            )),
        }
    }

    async fn is_available(&self, cmd: &str) -> bool {
        let Some(path_var) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&path_var).any(|dir| {
            let candidate = dir.join(cmd);
            candidate.is_file()
        })
    }
}

/// In-process fakes used by engine/orchestrator tests. Compiled only under
/// `cfg(test)`, but visible crate-wide so downstream test modules can use it.
#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A configurable stand-in for [`ExternalToolAdapter`].
    #[derive(Default)]
    pub struct FakeToolAdapter {
        pub outputs: Mutex<HashMap<String, ToolOutput>>,
        pub available: Mutex<HashMap<String, bool>>,
    }

    #[async_trait]
    impl ExternalToolAdapter for FakeToolAdapter {
        async fn run(
            &self,
            cmd: &str,
            _args: &[&str],
            _cwd: &Path,
            _stdin: Option<&str>,
            _deadline: Duration,
        ) -> std::io::Result<ToolOutput> {
            self.outputs
                .lock()
                .unwrap()
                .get(cmd)
                .cloned()
                .ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, format!("no fake for {cmd}"))
                })
        }

        async fn is_available(&self, cmd: &str) -> bool {
            *self.available.lock().unwrap().get(cmd).unwrap_or(&false)
        }
    }
}
