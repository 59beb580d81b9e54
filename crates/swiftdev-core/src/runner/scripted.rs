use super::{
    ExitCode, InputSink, LaunchError, ProcessEvent, ProcessLauncher, RunningProcess, StreamKind,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use swiftdev_build::{Invocation, ToolKind};
use tokio::sync::{mpsc, oneshot};

/// One step of a canned process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Emit a raw output chunk.
    Emit(StreamKind, String),
    /// Block until the session writes this line (compared trimmed).
    AwaitLine(String),
    /// Exit with the given code. Later steps are ignored.
    Exit(ExitCode),
    /// Never exit on its own; only a kill ends the process.
    Hang,
}

impl ScriptStep {
    pub fn stdout(text: &str) -> Self {
        ScriptStep::Emit(StreamKind::Stdout, text.to_string())
    }

    pub fn stderr(text: &str) -> Self {
        ScriptStep::Emit(StreamKind::Stderr, text.to_string())
    }

    pub fn await_line(line: &str) -> Self {
        ScriptStep::AwaitLine(line.to_string())
    }

    pub fn exit(code: i32) -> Self {
        ScriptStep::Exit(ExitCode(Some(code)))
    }
}

type Script = Option<Vec<ScriptStep>>;

#[derive(Debug, Default)]
struct ScriptState {
    scripts: HashMap<ToolKind, VecDeque<Script>>,
    launches: Vec<Invocation>,
}

/// A [`ProcessLauncher`] that replays queued scripts instead of spawning
/// processes, and records everything written to their input.
///
/// Scripts are consumed per [`ToolKind`] in the order they were pushed. A
/// launch with nothing queued behaves like a process that exits 0 silently.
#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    state: Arc<Mutex<ScriptState>>,
    written: Arc<Mutex<Vec<(ToolKind, String)>>>,
}

impl fmt::Debug for ScriptedLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedLauncher").finish_non_exhaustive()
    }
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the script for the next launch of `tool`.
    pub fn push(&self, tool: ToolKind, steps: Vec<ScriptStep>) {
        self.lock_state()
            .scripts
            .entry(tool)
            .or_default()
            .push_back(Some(steps));
    }

    /// Makes the next launch of `tool` fail as if the executable did not exist.
    pub fn push_missing(&self, tool: ToolKind) {
        self.lock_state()
            .scripts
            .entry(tool)
            .or_default()
            .push_back(None);
    }

    /// Lines written to processes of `tool`, across all launches, in order.
    pub fn written(&self, tool: ToolKind) -> Vec<String> {
        self.written
            .lock()
            .map(|w| {
                w.iter()
                    .filter(|(t, _)| *t == tool)
                    .map(|(_, line)| line.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every invocation passed to [`launch`](ProcessLauncher::launch), including
    /// the ones that failed.
    pub fn launches(&self) -> Vec<Invocation> {
        self.lock_state().launches.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        // A poisoned lock only means a test already panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(&self, invocation: &Invocation) -> Result<RunningProcess, LaunchError> {
        let script = {
            let mut state = self.lock_state();
            state.launches.push(invocation.clone());
            state
                .scripts
                .get_mut(&invocation.tool)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Some(Vec::new()))
        };

        let Some(steps) = script else {
            return Err(LaunchError::from_io(
                &invocation.program,
                io::Error::from(io::ErrorKind::NotFound),
            ));
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(play(steps, event_tx, line_rx, kill_rx));

        let input = RecordingInput {
            tool: invocation.tool,
            written: self.written.clone(),
            forward: line_tx,
        };
        Ok(RunningProcess::new(
            invocation.tool,
            None,
            event_rx,
            Box::new(input),
            kill_tx,
        ))
    }
}

/// Records lines synchronously so tests can assert on them without waiting
/// for the script task to run.
#[derive(Debug)]
struct RecordingInput {
    tool: ToolKind,
    written: Arc<Mutex<Vec<(ToolKind, String)>>>,
    forward: mpsc::UnboundedSender<String>,
}

impl InputSink for RecordingInput {
    fn send_line(&mut self, line: String) -> Result<(), String> {
        if let Ok(mut written) = self.written.lock() {
            written.push((self.tool, line.clone()));
        }
        // The script may have finished already; the line still counts as written.
        let _ = self.forward.send(line);
        Ok(())
    }
}

async fn play(
    steps: Vec<ScriptStep>,
    events: mpsc::UnboundedSender<ProcessEvent>,
    mut lines: mpsc::UnboundedReceiver<String>,
    mut kill: oneshot::Receiver<()>,
) {
    for step in steps {
        match step {
            ScriptStep::Emit(stream, text) => {
                let _ = events.send(ProcessEvent::Output { stream, text });
            }
            ScriptStep::AwaitLine(expected) => loop {
                tokio::select! {
                    _ = &mut kill => {
                        let _ = events.send(ProcessEvent::Exited(ExitCode::UNKNOWN));
                        return;
                    }
                    line = lines.recv() => match line {
                        Some(line) if line.trim() == expected.trim() => break,
                        Some(_) => continue,
                        None => {
                            let _ = events.send(ProcessEvent::Exited(ExitCode::UNKNOWN));
                            return;
                        }
                    }
                }
            },
            ScriptStep::Exit(code) => {
                let _ = events.send(ProcessEvent::Exited(code));
                return;
            }
            ScriptStep::Hang => {
                let _ = (&mut kill).await;
                let _ = events.send(ProcessEvent::Exited(ExitCode::UNKNOWN));
                return;
            }
        }
    }
    let _ = events.send(ProcessEvent::Exited(ExitCode::SUCCESS));
}
