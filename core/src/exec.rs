//! # External Command Adapter
//!
//! The narrow boundary behind which git, interpreter provisioning and
//! scanners live. Backends describe an invocation as a [`CommandSpec`];
//! the adapter runs it and reports exit status plus captured output.
//!
//! A non-zero exit is data, not an error: plugins decide what a failed
//! tool run means. `Err` is reserved for not being able to run the
//! program at all. Tests swap in a scripted implementation so no real
//! process is ever spawned.

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Description of one external invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Default::default()
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

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Rendering used in logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turns a failed run into an error carrying a stderr excerpt.
    pub fn require_success(&self, what: &str) -> anyhow::Result<()> {
        if self.success() {
            return Ok(());
        }
        let stderr = self.stderr.trim();
        let excerpt: String = stderr.chars().take(400).collect();
        anyhow::bail!("{what} exited with status {}: {excerpt}", self.status)
    }
}

pub trait Exec: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> anyhow::Result<ExecOutput>;
}

/// Runs commands on the host via `std::process`.
pub struct SystemExec;

impl Exec for SystemExec {
    fn run(&self, spec: &CommandSpec) -> anyhow::Result<ExecOutput> {
        use anyhow::Context;
        use std::io::Write;

        tracing::debug!(command = %spec.display(), "running external command");

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.workdir {
            command.current_dir(dir);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        command.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", spec.program))?;

        if let Some(data) = &spec.stdin {
            child
                .stdin
                .take()
                .expect("stdin was requested piped")
                .write_all(data.as_bytes())
                .with_context(|| format!("failed to feed stdin to '{}'", spec.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for '{}'", spec.program))?;

        Ok(ExecOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_spec_builds_incrementally() {
        let spec = CommandSpec::new("git")
            .args(["clone", "https://example.org/repo.git"])
            .workdir("/tmp/sources")
            .env("GIT_TERMINAL_PROMPT", "0");

        assert_eq!(spec.display(), "git clone https://example.org/repo.git");
        assert_eq!(spec.workdir.as_deref(), Some(std::path::Path::new("/tmp/sources")));
    }

    #[test]
    fn require_success_reports_the_status_and_stderr() {
        let output = ExecOutput {
            status: 2,
            stdout: String::new(),
            stderr: "fatal: repository not found".to_string(),
        };

        let err = output.require_success("git clone").unwrap_err();
        let rendered = format!("{err}");
        assert!(rendered.contains("status 2"));
        assert!(rendered.contains("repository not found"));
    }
}
