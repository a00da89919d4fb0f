//! Build invocation with a hard wall-clock limit.
//!
//! All subprocess plumbing (pipes, the timeout race, killing a stuck
//! build) is hidden behind `run_with_timeout`; callers see only a
//! `BuildOutcome`. Failing cycles leave a numbered log file behind for
//! the repair agent to parse.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{info, warn};

/// What one build invocation produced.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Exit code; `None` when the process was killed by the timeout or a
    /// signal.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, stdout first.
    pub output: String,
    pub timed_out: bool,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run `command` in `dir`, capturing output, killing the process if it
/// exceeds `limit`. Partial output captured before the kill is kept so
/// the log still shows how far the build got.
pub async fn run_with_timeout(
    command: &[String],
    dir: &Path,
    limit: Duration,
) -> Result<BuildOutcome> {
    let (program, args) = command
        .split_first()
        .context("Build command must not be empty")?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn build command `{program}`"))?;

    // Readers run concurrently with the wait so a chatty build cannot
    // deadlock on a full pipe.
    let stdout_pipe = child.stdout.take();
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout_pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });
    let stderr_pipe = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    let (exit_code, timed_out) = match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => {
            let status = status.context("Failed waiting for build process")?;
            (status.code(), false)
        }
        Err(_) => {
            warn!(limit_secs = limit.as_secs(), "Build exceeded time limit; killing process");
            if let Err(err) = child.start_kill() {
                warn!(%err, "Failed to kill timed-out build process");
            }
            let _ = child.wait().await;
            (None, true)
        }
    };

    // After a kill, orphaned grandchildren may still hold the pipe write
    // ends open; a short grace period bounds how long we wait for them.
    let grace = Duration::from_secs(5);
    let stdout = match tokio::time::timeout(grace, stdout_task).await {
        Ok(Ok(buf)) => buf,
        _ => Vec::new(),
    };
    let stderr = match tokio::time::timeout(grace, stderr_task).await {
        Ok(Ok(buf)) => buf,
        _ => Vec::new(),
    };
    let mut output = String::from_utf8_lossy(&stdout).into_owned();
    let stderr_text = String::from_utf8_lossy(&stderr);
    if !stderr_text.trim().is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&stderr_text);
    }

    Ok(BuildOutcome {
        exit_code,
        output,
        timed_out,
    })
}

/// Log file name for a correction cycle. The first build writes the base
/// name; every later build is named after the fix attempt it follows.
pub fn cycle_log_name(cycle: u32) -> String {
    if cycle <= 1 {
        "build_errors.log".to_string()
    } else {
        format!("build_errors_after_fix_attempt_{}.log", cycle - 1)
    }
}

pub struct BuildRunner {
    command: Vec<String>,
    limit: Duration,
}

impl BuildRunner {
    pub fn new(command: Vec<String>, limit: Duration) -> Self {
        Self { command, limit }
    }

    /// Build the project for the given cycle. On failure or timeout the
    /// output lands in the cycle's log file inside `project_dir` and its
    /// path is returned alongside the outcome.
    pub async fn build_cycle(
        &self,
        project_dir: &Path,
        cycle: u32,
    ) -> Result<(BuildOutcome, PathBuf)> {
        info!(cycle, dir = %project_dir.display(), "Building project");
        let outcome = run_with_timeout(&self.command, project_dir, self.limit).await?;
        let log_path = project_dir.join(cycle_log_name(cycle));

        if outcome.succeeded() {
            info!(cycle, "Build succeeded");
        } else {
            let mut log = String::new();
            if outcome.timed_out {
                log.push_str(&format!(
                    "Build timed out after {} seconds and was killed.\n\n",
                    self.limit.as_secs()
                ));
            }
            log.push_str(&outcome.output);
            if let Some(code) = outcome.exit_code {
                log.push_str(&format!("\nExit code: {code}\n"));
            }
            std::fs::write(&log_path, &log)
                .with_context(|| format!("Failed to write build log {}", log_path.display()))?;
            warn!(cycle, log = %log_path.display(), "Build failed; log written");
        }
        Ok((outcome, log_path))
    }

    /// Remove every cycle log up to and including `last_cycle`. Called
    /// after a successful build so a clean project carries no stale logs.
    pub fn clean_logs(project_dir: &Path, last_cycle: u32) {
        for cycle in 1..=last_cycle {
            let path = project_dir.join(cycle_log_name(cycle));
            if path.exists() && let Err(err) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), %err, "Failed to remove stale build log");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_cycle_log_names() {
        assert_eq!(cycle_log_name(1), "build_errors.log");
        assert_eq!(cycle_log_name(2), "build_errors_after_fix_attempt_1.log");
        assert_eq!(cycle_log_name(5), "build_errors_after_fix_attempt_4.log");
    }

    #[tokio::test]
    async fn test_successful_build_writes_no_log() {
        let dir = tempdir().unwrap();
        let runner = BuildRunner::new(sh("echo compiling; exit 0"), Duration::from_secs(10));
        let (outcome, log_path) = runner.build_cycle(dir.path(), 1).await.unwrap();
        assert!(outcome.succeeded());
        assert!(outcome.output.contains("compiling"));
        assert!(!log_path.exists());
    }

    #[tokio::test]
    async fn test_failed_build_writes_cycle_log() {
        let dir = tempdir().unwrap();
        let runner = BuildRunner::new(
            sh("echo 'Models/Foo.cs(3,5): error CS0246: type not found' >&2; exit 1"),
            Duration::from_secs(10),
        );
        let (outcome, log_path) = runner.build_cycle(dir.path(), 2).await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.exit_code, Some(1));
        assert_eq!(
            log_path.file_name().unwrap(),
            "build_errors_after_fix_attempt_1.log"
        );
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("CS0246"));
        assert!(log.contains("Exit code: 1"));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_marks_outcome() {
        let dir = tempdir().unwrap();
        let runner = BuildRunner::new(sh("echo started; exec sleep 30"), Duration::from_millis(300));
        let (outcome, log_path) = runner.build_cycle(dir.path(), 1).await.unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.exit_code, None);
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("timed out"));
        // Partial output captured before the kill survives.
        assert!(log.contains("started"));
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_interleaved_in_output() {
        let dir = tempdir().unwrap();
        let outcome = run_with_timeout(
            &sh("echo out-line; echo err-line >&2; exit 3"),
            dir.path(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.output.contains("out-line"));
        assert!(outcome.output.contains("err-line"));
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let dir = tempdir().unwrap();
        assert!(
            run_with_timeout(&[], dir.path(), Duration::from_secs(1))
                .await
                .is_err()
        );
    }

    #[test]
    fn test_clean_logs_removes_all_cycles() {
        let dir = tempdir().unwrap();
        for cycle in 1..=3 {
            std::fs::write(dir.path().join(cycle_log_name(cycle)), "x").unwrap();
        }
        BuildRunner::clean_logs(dir.path(), 3);
        for cycle in 1..=3 {
            assert!(!dir.path().join(cycle_log_name(cycle)).exists());
        }
    }
}
