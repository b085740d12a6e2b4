//! Privileged command execution.
//!
//! Everything this crate does to kernel state goes through a
//! [`PrivilegedExecutor`]: an ordered provisioning step runs in the
//! synchronous checked mode, a command launched inside a namespace runs in
//! the asynchronous streamed mode. Commands are always typed argument
//! vectors handed straight to the process-spawn interface; no shell string
//! is ever assembled for a privileged invocation.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error};

use crate::error::ExecError;
use crate::netns::LogChannel;

/// Execution mode for a privileged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Block until exit; a nonzero status is fatal.
    SyncChecked,
    /// Spawn, stream output line by line, never check the exit status.
    AsyncStreamed,
}

/// A privileged command: a typed argument vector plus how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedCommand {
    argv: Vec<String>,
    mode: ExecMode,
}

impl PrivilegedCommand {
    /// Builds a synchronous, exit-code-checked command.
    pub fn checked<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(argv, ExecMode::SyncChecked)
    }

    /// Builds an asynchronous, output-streamed command.
    pub fn streamed<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(argv, ExecMode::AsyncStreamed)
    }

    fn build<I, S>(argv: I, mode: ExecMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        debug_assert!(!argv.is_empty(), "command must name an executable");
        Self { argv, mode }
    }

    /// The argument vector, executable first.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    #[must_use]
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// Human-readable rendering used in logs and failure reports.
    #[must_use]
    pub fn rendered(&self) -> String {
        self.argv.join(" ")
    }
}

impl fmt::Display for PrivilegedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Capability to run commands with elevated rights.
///
/// The concrete escalation transport (a sudo broker, an already-root
/// process, a recording double in tests) varies behind this trait; the
/// lifecycle and runner code never know which one they are talking to.
pub trait PrivilegedExecutor: Send + Sync {
    /// Runs `cmd` to completion, failing on a nonzero exit status.
    ///
    /// # Errors
    ///
    /// `ExecError::Spawn` if the subprocess cannot start,
    /// `ExecError::CommandFailed` on a nonzero exit. Both carry the rendered
    /// command string.
    fn run_checked(&self, cmd: &PrivilegedCommand) -> Result<(), ExecError>;

    /// Spawns `cmd` and streams each output line to `channel` as it arrives.
    ///
    /// Fire and forget: the call returns once the subprocess is launched,
    /// the exit status is never examined, and an OS-level spawn failure is
    /// reported into the channel rather than to the caller.
    fn spawn_streaming(&self, cmd: &PrivilegedCommand, channel: Arc<LogChannel>);
}

/// Escalation through `sudo`.
///
/// Runs non-interactively (`-n`): the transport must be configured so no
/// password prompt appears, which also rules out credential-timeout
/// re-prompts in the middle of a provisioning sequence. The working
/// directory is pinned so relative paths behave the same regardless of
/// where the caller happens to be.
#[derive(Debug, Clone)]
pub struct SudoExecutor {
    working_dir: PathBuf,
}

impl SudoExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            working_dir: PathBuf::from("/"),
        }
    }

    /// Overrides the pinned working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    fn command(&self, cmd: &PrivilegedCommand) -> Command {
        let mut command = Command::new("sudo");
        command
            .arg("-n")
            .arg("--")
            .args(cmd.argv())
            .current_dir(&self.working_dir);
        command
    }
}

impl Default for SudoExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedExecutor for SudoExecutor {
    fn run_checked(&self, cmd: &PrivilegedCommand) -> Result<(), ExecError> {
        run_checked_impl(self.command(cmd), cmd)
    }

    fn spawn_streaming(&self, cmd: &PrivilegedCommand, channel: Arc<LogChannel>) {
        spawn_streaming_impl(self.command(cmd), cmd, channel);
    }
}

/// Escalation-free executor for processes that are already elevated.
#[derive(Debug, Clone, Default)]
pub struct DirectExecutor;

impl DirectExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn command(cmd: &PrivilegedCommand) -> Command {
        let argv = cmd.argv();
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]).current_dir("/");
        command
    }
}

impl PrivilegedExecutor for DirectExecutor {
    fn run_checked(&self, cmd: &PrivilegedCommand) -> Result<(), ExecError> {
        run_checked_impl(Self::command(cmd), cmd)
    }

    fn spawn_streaming(&self, cmd: &PrivilegedCommand, channel: Arc<LogChannel>) {
        spawn_streaming_impl(Self::command(cmd), cmd, channel);
    }
}

fn run_checked_impl(mut command: Command, cmd: &PrivilegedCommand) -> Result<(), ExecError> {
    debug!(command = %cmd, "Running privileged command");

    let status = command
        .stdin(Stdio::null())
        .status()
        .map_err(|e| ExecError::Spawn {
            command: cmd.rendered(),
            source: e,
        })?;

    if status.success() {
        Ok(())
    } else {
        error!(command = %cmd, %status, "Privileged command failed");
        Err(ExecError::CommandFailed {
            command: cmd.rendered(),
            status,
        })
    }
}

fn spawn_streaming_impl(mut command: Command, cmd: &PrivilegedCommand, channel: Arc<LogChannel>) {
    debug!(command = %cmd, "Spawning streamed privileged command");

    let spawned = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            // Swallowed by design: streamed failures are only visible here.
            channel.push(format!("failed to spawn `{cmd}`: {e}"));
            return;
        }
    };

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, Arc::clone(&channel));
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, channel);
    }

    // Reap off-thread; the exit status is deliberately not checked.
    thread::spawn(move || {
        let _ = child.wait();
    });
}

/// Drains `reader` line by line into `channel` on a dedicated thread, so
/// the child can never block on a full pipe while the caller moves on.
fn forward_lines<R>(reader: R, channel: Arc<LogChannel>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => channel.push(line),
                Err(_) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_lines(channel: &LogChannel, count: usize) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let lines = channel.lines();
            if lines.len() >= count || Instant::now() > deadline {
                return lines;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_rendered_joins_argv() {
        let cmd = PrivilegedCommand::checked(["ip", "netns", "add", "vpnns-x"]);
        assert_eq!(cmd.rendered(), "ip netns add vpnns-x");
        assert_eq!(format!("{cmd}"), "ip netns add vpnns-x");
        assert_eq!(cmd.mode(), ExecMode::SyncChecked);
    }

    #[test]
    fn test_direct_run_checked_success() {
        let executor = DirectExecutor::new();
        let cmd = PrivilegedCommand::checked(["true"]);
        executor.run_checked(&cmd).expect("true should succeed");
    }

    #[test]
    fn test_direct_run_checked_nonzero_is_fatal_and_names_the_command() {
        let executor = DirectExecutor::new();
        let cmd = PrivilegedCommand::checked(["false"]);

        let err = executor.run_checked(&cmd).expect_err("false should fail");
        match err {
            ExecError::CommandFailed { command, status } => {
                assert_eq!(command, "false");
                assert!(!status.success());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_direct_run_checked_missing_binary_is_spawn_error() {
        let executor = DirectExecutor::new();
        let cmd = PrivilegedCommand::checked(["definitely-not-a-real-binary-xyz"]);

        let err = executor.run_checked(&cmd).expect_err("spawn should fail");
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_direct_streaming_forwards_lines() {
        let executor = DirectExecutor::new();
        let channel = Arc::new(LogChannel::new("vpnns-stream-test"));
        let cmd = PrivilegedCommand::streamed(["sh", "-c", "echo one; echo two"]);

        executor.spawn_streaming(&cmd, Arc::clone(&channel));

        let lines = wait_for_lines(&channel, 2);
        assert!(lines.contains(&"one".to_string()), "lines: {lines:?}");
        assert!(lines.contains(&"two".to_string()), "lines: {lines:?}");
    }

    #[test]
    fn test_direct_streaming_spawn_failure_lands_in_channel() {
        let executor = DirectExecutor::new();
        let channel = Arc::new(LogChannel::new("vpnns-stream-fail"));
        let cmd = PrivilegedCommand::streamed(["definitely-not-a-real-binary-xyz"]);

        executor.spawn_streaming(&cmd, Arc::clone(&channel));

        let lines = wait_for_lines(&channel, 1);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("failed to spawn"), "line: {}", lines[0]);
    }
}
