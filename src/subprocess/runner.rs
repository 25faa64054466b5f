use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::ProcessError;

/// Deadline applied when an operation does not declare its own
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Per-stream capture limit; anything larger is treated as a failure
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 8 * 1024 * 1024;

const READ_CHUNK_SIZE: usize = 8192;

/// A fully specified external tool call.
///
/// Every command carries its own working directory, environment and
/// deadline; nothing is taken from process-wide state except the
/// essential variables the runner preserves (PATH, HOME, locale).
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub stdin: Option<String>,
    pub max_output_bytes: usize,
}

impl ProcessCommand {
    /// The argument vector re-joined with shell quoting, for diagnostics
    pub fn command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    /// Set when either stream exceeded the capture limit and the process was killed
    pub output_overflow: bool,
}

impl ProcessOutput {
    pub fn timed_out(&self) -> bool {
        matches!(self.status, ExitStatus::Timeout)
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Timeout,
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

/// Kills the child's whole process group unless disarmed.
///
/// The child is spawned as the leader of a new group, so the group id is
/// its pid. Dropping an armed guard (deadline expiry, output overflow or
/// the caller dropping the future) terminates every process in the group.
struct ProcessGroupGuard {
    pgid: Option<i32>,
    armed: bool,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.map(|p| p as i32),
            armed: true,
        }
    }

    #[cfg(unix)]
    fn kill(&self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pgid) = self.pgid {
            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                tracing::trace!("killpg({}) failed: {}", pgid, e);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if self.armed {
            self.kill();
        }
    }
}

pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Log command execution details
    fn log_command_start(command: &ProcessCommand) {
        tracing::debug!(
            "Executing subprocess: {} (deadline {:?})",
            command.command_line(),
            command.timeout
        );

        if !command.env.is_empty() {
            // Values may hold credentials; only names are logged.
            let mut keys: Vec<&str> = command.env.keys().map(String::as_str).collect();
            keys.sort_unstable();
            tracing::trace!("Environment overrides: {}", keys.join(", "));
        }

        let args_size: usize = command.args.iter().map(|s| s.len()).sum();
        if args_size > 10000 {
            tracing::warn!(
                "Large arguments detected: {} args, {} total bytes",
                command.args.len(),
                args_size
            );
        }

        if let Some(ref dir) = command.working_dir {
            tracing::trace!("Working directory: {:?}", dir);
        }

        if let Some(ref stdin) = command.stdin {
            tracing::trace!("Stdin provided: {} bytes", stdin.len());
        }
    }

    /// Configure the command with environment and working directory
    fn configure_command(
        command: &ProcessCommand,
    ) -> Result<tokio::process::Command, ProcessError> {
        let mut cmd = tokio::process::Command::new(&command.program);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd.args(&command.args);
        cmd.kill_on_drop(true);

        cmd.env_clear();
        Self::preserve_essential_env(&mut cmd, &command.program)?;

        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        Self::configure_stdio(&mut cmd, command);
        Ok(cmd)
    }

    /// Preserve essential system environment variables
    /// Returns an error if PATH is missing
    fn preserve_essential_env(
        cmd: &mut tokio::process::Command,
        program: &str,
    ) -> Result<(), ProcessError> {
        let optional_vars = ["HOME", "USER", "SHELL", "TMPDIR", "TERM"];

        match std::env::var("PATH") {
            Ok(value) => {
                cmd.env("PATH", value);
            }
            Err(e) => {
                tracing::error!(
                    "Required environment variable PATH is not available for command '{}': {:?}",
                    program,
                    e
                );
                return Err(ProcessError::InternalError {
                    message: format!(
                        "Critical environment variable PATH is not available (required for '{}')",
                        program
                    ),
                });
            }
        }

        let mut optional_failed = Vec::new();
        for var in &optional_vars {
            match std::env::var(var) {
                Ok(value) => {
                    cmd.env(var, value);
                }
                Err(_) => optional_failed.push(*var),
            }
        }

        Self::preserve_locale_env(cmd);

        if !optional_failed.is_empty() {
            tracing::debug!(
                "Optional env vars not available for '{}': {}",
                program,
                optional_failed.join(", ")
            );
        }

        Ok(())
    }

    /// Preserve locale variables, defaulting LANG so tool output stays UTF-8
    fn preserve_locale_env(cmd: &mut tokio::process::Command) {
        match std::env::var("LANG") {
            Ok(value) => {
                cmd.env("LANG", value);
            }
            Err(_) => {
                let fallback = std::env::var("LC_ALL")
                    .or_else(|_| std::env::var("LC_CTYPE"))
                    .unwrap_or_else(|_| "C.UTF-8".to_string());
                cmd.env("LANG", fallback);
            }
        }

        for var in ["LC_ALL", "LC_CTYPE"] {
            if let Ok(value) = std::env::var(var) {
                cmd.env(var, value);
            }
        }
    }

    /// Configure stdio pipes for the process
    fn configure_stdio(cmd: &mut tokio::process::Command, command: &ProcessCommand) {
        if command.stdin.is_some() {
            cmd.stdin(std::process::Stdio::piped());
        } else {
            cmd.stdin(std::process::Stdio::null());
        }

        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
    }

    /// Write stdin data to the child process, then close the pipe.
    ///
    /// A child may exit without reading its input; the resulting write
    /// error is logged and the outcome is left to the exit status.
    async fn write_stdin(stdin: Option<tokio::process::ChildStdin>, data: Option<&str>) {
        use tokio::io::AsyncWriteExt;

        let (Some(mut stdin), Some(data)) = (stdin, data) else {
            return;
        };
        if let Err(e) = stdin.write_all(data.as_bytes()).await {
            tracing::debug!("Child stopped reading stdin: {}", e);
            return;
        }
        if let Err(e) = stdin.shutdown().await {
            tracing::debug!("Closing child stdin failed: {}", e);
        }
    }

    /// Read a stream to EOF, stopping at `limit` bytes.
    ///
    /// On overflow the process group is killed so the peer stream reaches
    /// EOF as well. Returns the captured bytes and whether the limit was hit.
    async fn read_capped<R>(
        mut reader: R,
        limit: usize,
        guard: &ProcessGroupGuard,
    ) -> std::io::Result<(Vec<u8>, bool)>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok((buffer, false));
            }
            if buffer.len() + n > limit {
                let room = limit - buffer.len();
                buffer.extend_from_slice(&chunk[..room]);
                guard.kill();
                return Ok((buffer, true));
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Convert process exit status to our ExitStatus enum
    fn parse_exit_status(status: std::process::ExitStatus) -> ExitStatus {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    /// Parse signal status on Unix systems
    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            ExitStatus::Signal(signal)
        } else {
            ExitStatus::Error(1)
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus::Error(1)
    }

    /// Log the process execution result
    fn log_result(result: &ProcessOutput, command: &ProcessCommand) {
        let command_str = command.command_line();

        match &result.status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    result.duration,
                    command_str
                );
                tracing::trace!("Stdout length: {} bytes", result.stdout.len());
                tracing::trace!("Stderr length: {} bytes", result.stderr.len());
            }
            ExitStatus::Error(code) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    code,
                    result.duration,
                    command_str
                );
                if !result.stderr.is_empty() {
                    tracing::trace!("Stderr: {}", result.stderr_text());
                }
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {}",
                    signal,
                    result.duration,
                    command_str
                );
            }
            ExitStatus::Timeout => {
                tracing::warn!(
                    "Subprocess timed out after {:?}: {}",
                    result.duration,
                    command_str
                );
            }
        }

        if result.output_overflow {
            tracing::warn!(
                "Subprocess output exceeded {} bytes and was killed: {}",
                command.max_output_bytes,
                command_str
            );
        }
    }

    /// Map spawn error to ProcessError
    fn map_spawn_error(error: std::io::Error, command: &ProcessCommand) -> ProcessError {
        tracing::error!(
            "Failed to spawn '{}': {:?} (kind: {:?})",
            command.program,
            error,
            error.kind()
        );

        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::CommandNotFound(command.program.clone())
        } else {
            ProcessError::SpawnFailed {
                command: command.command_line(),
                source: error,
            }
        }
    }

    /// Extract a stream from a child process, converting None to error
    fn extract_stream<T>(stream: Option<T>, stream_name: &str) -> Result<T, ProcessError> {
        stream.ok_or_else(|| ProcessError::InternalError {
            message: format!("Failed to capture {}", stream_name),
        })
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let start = Instant::now();

        Self::log_command_start(&command);

        let mut cmd = Self::configure_command(&command)?;
        let mut child = cmd
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &command))?;
        let mut guard = ProcessGroupGuard::new(child.id());

        let stdin = child.stdin.take();
        let stdout = Self::extract_stream(child.stdout.take(), "stdout")?;
        let stderr = Self::extract_stream(child.stderr.take(), "stderr")?;
        let limit = command.max_output_bytes;

        let completed = tokio::time::timeout(command.timeout, async {
            let ((), stdout, stderr) = tokio::join!(
                Self::write_stdin(stdin, command.stdin.as_deref()),
                Self::read_capped(stdout, limit, &guard),
                Self::read_capped(stderr, limit, &guard)
            );
            let status = child.wait().await;
            (stdout, stderr, status)
        })
        .await;

        let io_error = |source| ProcessError::IoError {
            command: command.command_line(),
            source,
        };

        let result = match completed {
            Ok((stdout, stderr, status)) => {
                let (stdout, stdout_overflow) = stdout.map_err(io_error)?;
                let (stderr, stderr_overflow) = stderr.map_err(io_error)?;
                let status = status.map_err(io_error)?;
                guard.disarm();

                ProcessOutput {
                    status: Self::parse_exit_status(status),
                    stdout,
                    stderr,
                    duration: start.elapsed(),
                    output_overflow: stdout_overflow || stderr_overflow,
                }
            }
            Err(_) => {
                guard.kill();
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to reap timed-out child: {}", e);
                }
                guard.disarm();

                ProcessOutput {
                    status: ExitStatus::Timeout,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    duration: start.elapsed(),
                    output_overflow: false,
                }
            }
        };

        Self::log_result(&result, &command);

        Ok(result)
    }
}
