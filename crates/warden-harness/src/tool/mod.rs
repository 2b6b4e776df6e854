//! External checker invocation.
//!
//! Checkers such as type checkers and linters run as child processes. The
//! [`ToolRunner`] trait abstracts process execution so validation can be
//! exercised without spawning real tools; [`ProcessToolRunner`] is the
//! production implementation. Every invocation carries its own timeout, which
//! bounds both the tool and any process still holding its output pipes.

use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Tracing target for tool invocations.
const TOOL_TARGET: &str = "warden_harness::tool";

/// Placeholder replaced by the target file in command lines.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolInvocation {
    /// Creates an invocation from explicit parts.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Builds an invocation from a whitespace-separated command line.
    ///
    /// Every `{path}` token is replaced by `path`; when the command line has
    /// no placeholder the path is appended as the final argument. Returns
    /// `None` for an empty command line.
    #[must_use]
    pub fn from_command_line(command_line: &str, path: &Path, timeout: Duration) -> Option<Self> {
        let target = path.to_string_lossy();
        let mut tokens = command_line.split_whitespace();
        let program = tokens.next()?;
        let mut args: Vec<String> = tokens
            .map(|token| token.replace(PATH_PLACEHOLDER, &target))
            .collect();
        if !command_line.contains(PATH_PLACEHOLDER) {
            args.push(target.into_owned());
        }
        Some(Self::new(program, args, timeout))
    }

    /// Executable name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Maximum time the tool may run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Captured result of a completed tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    status: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    /// Creates an output record.
    #[must_use]
    pub fn new(status: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code, or `None` when the process was terminated by a signal.
    #[must_use]
    pub const fn status(&self) -> Option<i32> {
        self.status
    }

    /// Returns true when the tool exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Lines of both streams, stdout first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().chain(self.stderr.lines())
    }
}

/// Reasons a tool could not produce an output at all.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The executable does not exist on the search path.
    #[error("tool '{program}' was not found")]
    NotFound {
        /// Executable that was looked up.
        program: String,
    },

    /// The process could not be started.
    #[error("tool '{program}' failed to start: {source}")]
    Spawn {
        /// Executable that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The process ran past its timeout and was killed.
    #[error("tool '{program}' timed out after {timeout_secs}s")]
    Timeout {
        /// Executable that timed out.
        program: String,
        /// Timeout that was exceeded, in whole seconds.
        timeout_secs: u64,
    },

    /// Waiting for the process failed.
    #[error("I/O error while running tool '{program}': {source}")]
    Io {
        /// Executable being waited on.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Executes external tools.
pub trait ToolRunner {
    /// Runs `invocation` to completion or until its timeout expires.
    ///
    /// A non-zero exit is a successful run; only failures to obtain any
    /// output are errors.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when the tool cannot be found, started or
    /// waited on, or when it exceeds its timeout.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Runs tools as child processes of the current process.
///
/// On Unix each tool leads its own process group, so a timeout kills wrapper
/// scripts and the processes they started together.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessToolRunner;

impl ToolRunner for ProcessToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program();
        let timeout = invocation.timeout();
        debug!(
            target: TOOL_TARGET,
            program,
            args = ?invocation.args(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "spawning tool"
        );

        let started = Instant::now();
        let mut command = Command::new(program);
        command
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn().map_err(|error| spawn_error(program, error))?;

        // Pipes are drained on their own threads so a chatty tool cannot
        // block on a full buffer while we wait for it.
        let (sender, receiver) = mpsc::channel();
        let mut streams = 0usize;
        if let Some(pipe) = child.stdout.take() {
            drain(Stream::Stdout, pipe, sender.clone());
            streams += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            drain(Stream::Stderr, pipe, sender);
            streams += 1;
        }

        let status = wait(program, &mut child, timeout)?;
        let remaining = timeout.saturating_sub(started.elapsed());
        let (stdout, stderr) = collect(program, &mut child, &receiver, streams, remaining);
        let output = ToolOutput::new(status, stdout, stderr);
        debug!(
            target: TOOL_TARGET,
            program,
            status = ?output.status(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "tool exited"
        );
        Ok(output)
    }
}

/// Time granted to the pipe readers once the process group has been killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_error(program: &str, error: io::Error) -> ToolError {
    if error.kind() == io::ErrorKind::NotFound {
        ToolError::NotFound {
            program: program.to_owned(),
        }
    } else {
        ToolError::Spawn {
            program: program.to_owned(),
            source: Arc::new(error),
        }
    }
}

fn wait(program: &str, child: &mut Child, timeout: Duration) -> Result<Option<i32>, ToolError> {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => Ok(status.code()),
        Ok(None) => {
            warn!(
                target: TOOL_TARGET,
                program,
                timeout_secs = timeout.as_secs(),
                "tool timed out, killing process group"
            );
            kill_tree(program, child);
            drop(child.wait());
            Err(ToolError::Timeout {
                program: program.to_owned(),
                timeout_secs: timeout.as_secs(),
            })
        }
        Err(error) => {
            kill_tree(program, child);
            Err(ToolError::Io {
                program: program.to_owned(),
                source: Arc::new(error),
            })
        }
    }
}

/// Kills the tool and, on Unix, every process left in its group.
fn kill_tree(program: &str, child: &mut Child) {
    kill_group(program, child);
    if let Err(error) = child.kill() {
        debug!(target: TOOL_TARGET, program, %error, "tool already exited");
    }
}

#[cfg(unix)]
fn kill_group(program: &str, child: &Child) {
    if let Ok(pid) = i32::try_from(child.id())
        && let Err(errno) = killpg(Pid::from_raw(pid), Signal::SIGKILL)
    {
        debug!(target: TOOL_TARGET, program, %errno, "process group already gone");
    }
}

#[cfg(not(unix))]
const fn kill_group(_program: &str, _child: &Child) {}

fn drain<R>(stream: Stream, mut reader: R, sender: Sender<(Stream, Vec<u8>)>)
where
    R: Read + Send + 'static,
{
    drop(thread::spawn(move || {
        let mut buffer = Vec::new();
        if reader.read_to_end(&mut buffer).is_err() {
            buffer.clear();
        }
        drop(sender.send((stream, buffer)));
    }));
}

/// Gathers both streams within `remaining`.
///
/// A descendant that outlives the tool keeps its pipes open. Once the budget
/// is spent the process group is killed and whatever the readers return
/// within [`DRAIN_GRACE`] is kept.
fn collect(
    program: &str,
    child: &mut Child,
    receiver: &Receiver<(Stream, Vec<u8>)>,
    streams: usize,
    remaining: Duration,
) -> (String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut pending = streams;
    let mut budget = remaining;
    let mut killed = false;

    while pending > 0 {
        match receiver.recv_timeout(budget) {
            Ok((Stream::Stdout, bytes)) => {
                stdout = bytes;
                pending = pending.saturating_sub(1);
            }
            Ok((Stream::Stderr, bytes)) => {
                stderr = bytes;
                pending = pending.saturating_sub(1);
            }
            Err(RecvTimeoutError::Timeout) if !killed => {
                warn!(
                    target: TOOL_TARGET,
                    program,
                    "tool descendants still hold its output, killing process group"
                );
                kill_tree(program, child);
                killed = true;
                budget = DRAIN_GRACE;
            }
            Err(_) => break,
        }
    }

    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}
