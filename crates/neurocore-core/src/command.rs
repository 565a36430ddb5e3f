//! External process invocation.
//!
//! Every system tweak ends up as a `CommandSpec`: a program name plus an
//! argument vector. There is no shell in between, so argument values can never
//! be reinterpreted as shell syntax. Values that come from configuration are
//! validated separately in `params`.

use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Maximum number of characters of tool output kept in errors and results.
pub const OUTPUT_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// CommandSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Added on top of the inherited host environment.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// `powershell -NoProfile -NonInteractive -Command <script>`.
    ///
    /// The script must be a constant or built only from validated parameters.
    pub fn powershell(script: impl Into<String>) -> Self {
        Self::new("powershell").args([
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script.into(),
        ])
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CommandOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout if non-empty, otherwise stderr, trimmed and truncated.
    pub fn summary(&self) -> String {
        let text = if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        };
        truncate(text.trim(), OUTPUT_LIMIT)
    }
}

pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

// ---------------------------------------------------------------------------
// CommandRunner
// ---------------------------------------------------------------------------

/// Executes a `CommandSpec`.
///
/// `Ok` only for a zero exit status. A non-zero exit is `CommandFailed`; a
/// failure to start the process at all is `CommandSpawnFailed`.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput>>;
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            debug!(command = %spec, "spawning");
            let mut cmd = tokio::process::Command::new(&spec.program);
            cmd.args(&spec.args)
                .envs(&spec.env)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = &spec.cwd {
                cmd.current_dir(dir);
            }

            let output = cmd
                .output()
                .await
                .map_err(|e| CoreError::CommandSpawnFailed {
                    program: spec.program.clone(),
                    reason: e.to_string(),
                })?;

            let out = CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };

            if !output.status.success() {
                return Err(CoreError::CommandFailed {
                    program: spec.program.clone(),
                    code: out.code,
                    output: out.summary(),
                });
            }
            Ok(out)
        })
    }
}

/// Whether `program` resolves on `PATH`.
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_whitespace_args() {
        let spec = CommandSpec::new("powercfg").args(["-changename", "GUID", "NeuroCore Gaming"]);
        assert_eq!(spec.to_string(), "powercfg -changename GUID \"NeuroCore Gaming\"");
    }

    #[test]
    fn powershell_wraps_script_as_single_arg() {
        let spec = CommandSpec::powershell("Get-NetQosPolicy | Format-List");
        assert_eq!(spec.program, "powershell");
        assert_eq!(spec.args.last().unwrap(), "Get-NetQosPolicy | Format-List");
        assert_eq!(spec.args.len(), 4);
    }

    #[test]
    fn summary_prefers_stdout_and_truncates() {
        let out = CommandOutput {
            code: Some(1),
            stdout: "x".repeat(OUTPUT_LIMIT + 50),
            stderr: "ignored".into(),
        };
        assert_eq!(out.summary().len(), OUTPUT_LIMIT);

        let out = CommandOutput {
            code: Some(1),
            stdout: "  \n".into(),
            stderr: " access denied \n".into(),
        };
        assert_eq!(out.summary(), "access denied");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let spec = CommandSpec::new("neurocore-no-such-program-xyz");
        let err = SystemCommandRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, CoreError::CommandSpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_command_failed() {
        let spec = CommandSpec::new("sh").args(["-c", "echo denied >&2; exit 3"]);
        let err = SystemCommandRunner.run(&spec).await.unwrap_err();
        match err {
            CoreError::CommandFailed { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn args_are_not_shell_interpreted() {
        let spec = CommandSpec::new("echo").arg("C: & del *");
        let out = SystemCommandRunner.run(&spec).await.unwrap();
        assert_eq!(out.stdout.trim(), "C: & del *");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn env_additions_reach_child() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf %s \"$NEUROCORE_TEST_VAR\""])
            .env("NEUROCORE_TEST_VAR", "on");
        let out = SystemCommandRunner.run(&spec).await.unwrap();
        assert_eq!(out.stdout, "on");
    }

    #[cfg(unix)]
    #[test]
    fn availability_checks_path() {
        assert!(is_available("sh"));
        assert!(!is_available("neurocore-no-such-tool"));
    }
}
