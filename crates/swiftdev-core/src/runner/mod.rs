//! Child process supervision.
//!
//! ## Overview
//!
//! A [`ProcessLauncher`] turns an [`Invocation`] into a [`RunningProcess`]:
//! a handle that delivers the child's output as a sequence of
//! [`ProcessEvent`]s over a channel and accepts lines for its standard input.
//!
//! ```text
//! ┌──────────────┐  launch()   ┌────────────────┐  next_event()  ┌──────────────┐
//! │ Invocation   │ ──────────► │ RunningProcess │ ─────────────► │ DebugSession │
//! └──────────────┘             │  (owns child)  │ ◄───────────── │              │
//!                              └────────────────┘  write_line()  └──────────────┘
//! ```
//!
//! Output of one physical stream arrives in emission order; the exit event is
//! always the last event of a process. Chunks are not line-aligned.
//!
//! ## Launchers
//!
//! - **Production**: [`SystemLauncher`] spawns real processes with tokio
//! - **Testing**: [`ScriptedLauncher`] replays canned output and records input
//!
//! ## Launch failures
//!
//! A process that cannot be spawned at all is reported as a [`LaunchError`],
//! never as an exit code, so callers can tell "tool not installed" apart from
//! "tool ran and failed".

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use swiftdev_build::{Invocation, ToolKind};
use tokio::sync::{mpsc, oneshot};

pub mod scripted;
pub mod system;

pub use scripted::{ScriptStep, ScriptedLauncher};
pub use system::SystemLauncher;

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A raw chunk of text; may end mid-line.
    Output { stream: StreamKind, text: String },
    Exited(ExitCode),
}

/// Exit code of a finished process. `None` when the process was killed by a
/// signal or the code could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub Option<i32>);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(Some(0));
    pub const UNKNOWN: ExitCode = ExitCode(None);

    pub fn success(self) -> bool {
        self.0 == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitCode {
    fn from(status: std::process::ExitStatus) -> Self {
        ExitCode(status.code())
    }
}

/// Parses textual exit codes leniently: surrounding whitespace is ignored and
/// anything non-numeric becomes [`ExitCode::UNKNOWN`], which counts as failure.
impl FromStr for ExitCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ExitCode(s.trim().parse().ok()))
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{code}"),
            None => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("couldn't find {}", .program.display())]
    NotFound { program: PathBuf },
    #[error("permission denied launching {}", .program.display())]
    PermissionDenied { program: PathBuf },
    #[error("failed to launch {}: {source}", .program.display())]
    Io {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub fn from_io(program: &Path, source: io::Error) -> Self {
        let program = program.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => LaunchError::NotFound { program },
            io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied { program },
            _ => LaunchError::Io { program, source },
        }
    }

    pub fn program(&self) -> &Path {
        match self {
            LaunchError::NotFound { program }
            | LaunchError::PermissionDenied { program }
            | LaunchError::Io { program, .. } => program,
        }
    }
}

/// Trait for spawning external commands.
/// This allows us to swap real processes for scripted ones in tests.
pub trait ProcessLauncher: Send + Sync + fmt::Debug {
    /// Spawns `invocation`.
    ///
    /// # Errors
    ///
    /// Returns a [`LaunchError`] when the process could not be started at all
    /// (missing executable, permission denied, ...).
    fn launch(&self, invocation: &Invocation) -> Result<RunningProcess, LaunchError>;
}

/// Destination of the lines written to a process's standard input.
pub trait InputSink: Send + fmt::Debug {
    /// Delivers one line, without its terminator.
    ///
    /// # Errors
    ///
    /// Fails when the process can no longer read its input.
    fn send_line(&mut self, line: String) -> Result<(), String>;
}

impl InputSink for mpsc::UnboundedSender<String> {
    fn send_line(&mut self, line: String) -> Result<(), String> {
        self.send(line).map_err(|_| "stdin closed".to_string())
    }
}

/// Handle to one live child process.
///
/// Dropping the handle terminates the process if it is still running, so no
/// code path can leave an orphan behind.
#[derive(Debug)]
pub struct RunningProcess {
    tool: ToolKind,
    pid: Option<u32>,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
    input: Box<dyn InputSink>,
    kill: Option<oneshot::Sender<()>>,
    exit: Option<ExitCode>,
}

impl RunningProcess {
    /// Assembles a handle from the channels a launcher wired to its process.
    pub fn new(
        tool: ToolKind,
        pid: Option<u32>,
        events: mpsc::UnboundedReceiver<ProcessEvent>,
        input: Box<dyn InputSink>,
        kill: oneshot::Sender<()>,
    ) -> Self {
        Self {
            tool,
            pid,
            events,
            input,
            kill: Some(kill),
            exit: None,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The exit code, once the exit event has been received.
    pub fn exit_code(&self) -> Option<ExitCode> {
        self.exit
    }

    /// Writes `text` followed by a newline to the process's standard input.
    ///
    /// Failures are logged, not returned: writing to a process that already
    /// exited is expected during teardown. Returns whether the line was sent.
    pub fn write_line(&mut self, text: &str) -> bool {
        if let Some(code) = self.exit {
            log::warn!(
                "{} already exited ({}); dropping input {:?}",
                self.tool,
                code,
                text
            );
            return false;
        }
        match self.input.send_line(text.to_string()) {
            Ok(()) => {
                log::debug!("{} <- {}", self.tool, text);
                true
            }
            Err(e) => {
                log::warn!("Failed to write to {}: {}", self.tool, e);
                false
            }
        }
    }

    /// Waits for the next chunk of output or the exit.
    ///
    /// Returns `None` once the exit event has been delivered. Cancel safe.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        if self.exit.is_some() {
            return None;
        }
        match self.events.recv().await {
            Some(ProcessEvent::Exited(code)) => {
                self.exit = Some(code);
                log::info!("{} exited with code {}", self.tool, code);
                Some(ProcessEvent::Exited(code))
            }
            Some(event) => Some(event),
            None => {
                // Launcher went away without reporting an exit.
                self.exit = Some(ExitCode::UNKNOWN);
                Some(ProcessEvent::Exited(ExitCode::UNKNOWN))
            }
        }
    }

    /// Discards remaining output and waits for the exit code.
    pub async fn wait(&mut self) -> ExitCode {
        while let Some(event) = self.next_event().await {
            if let ProcessEvent::Exited(code) = event {
                return code;
            }
        }
        self.exit.unwrap_or(ExitCode::UNKNOWN)
    }

    /// Requests immediate termination. The exit event still follows through
    /// [`next_event`](Self::next_event).
    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            log::warn!("Killing {} (pid {:?})", self.tool, self.pid);
            let _ = kill.send(());
        }
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        if self.exit.is_none() {
            self.kill();
        }
    }
}
