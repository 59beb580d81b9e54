//! Build, test and debug orchestration.
//!
//! ## Overview
//!
//! A [`DebugSession`] owns everything one target needs for a
//! build → (run | test) cycle: the [`SessionState`], the
//! [`DiagnosticsSink`], the [`BreakpointSet`] and at most one process per
//! [`ToolKind`]. All output leaves the session as [`SessionEvent`]s on the
//! channel returned by [`DebugSession::new`].
//!
//! ```text
//!  build() / test()            run_after_build()
//!  ┌─────────┐  swift exits    ┌───────────┐  lldb output  ┌─────────┐
//!  │building │ ──────────────► │ launching │ ────────────► │ running │ ◄─┐
//!  └─────────┘                 └───────────┘               └────┬────┘   │
//!                                                               ▼        │
//!                                                          ┌────────┐    │
//!                                                          │ paused │ ───┘
//!                                                          └────────┘
//! ```
//!
//! The debugger is driven by [`pump`](DebugSession::pump): each call
//! processes one chunk of its output. Callers that only want to wait for the
//! end use [`run_until_exit`](DebugSession::run_until_exit).
//!
//! ## Failure handling
//!
//! Tool failures never escape as errors. A missing executable is announced
//! once per tool kind with [`SessionEvent::ToolMissing`]; a failed build ends
//! in `buildFailed` with its diagnostics recorded. The session can always
//! start another cycle afterwards.

use crate::breakpoints::BreakpointSet;
use crate::config::SessionConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::runner::{
    ExitCode, LaunchError, ProcessEvent, ProcessLauncher, RunningProcess, StreamKind,
    SystemLauncher,
};
use crate::state::{SessionState, Trigger};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swiftdev_build::{DebuggerCommand, Invocation, StepKind, Target, ToolKind};
use swiftdev_log::OutputStream;
use swiftdev_log::ir::{Diagnostic, EventPayload, Lifecycle, OutputEvent};
use tokio::sync::mpsc;

/// Notifications for whatever presents the session (editor, terminal, test).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        old: SessionState,
        new: SessionState,
    },
    /// One line for the console, without its terminator.
    Console(String),
    ConsoleCleared,
    /// All previously reported diagnostics are stale.
    DiagnosticsReset,
    Diagnostic(Diagnostic),
    ToolMissing {
        tool: ToolKind,
        program: PathBuf,
        detail: String,
    },
}

/// Result of a build or test run.
///
/// A plain [`DebugSession::build`] ends in `initial` both when it succeeds
/// and when the build tool is missing. Callers tell the two apart by the
/// outcome, not by the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// The tool ran and exited with a nonzero (or unknown) code.
    Failure { code: Option<i32> },
    /// The tool could not be launched.
    ToolMissing,
}

impl BuildOutcome {
    pub fn is_success(self) -> bool {
        self == BuildOutcome::Success
    }

    fn from_exit(code: ExitCode) -> Self {
        if code.success() {
            BuildOutcome::Success
        } else {
            BuildOutcome::Failure { code: code.0 }
        }
    }
}

#[derive(Debug)]
struct AttachedDebugger {
    process: RunningProcess,
    stdout: OutputStream,
    stderr: OutputStream,
    /// `exit` was sent or the process was killed.
    stop_requested: bool,
}

impl AttachedDebugger {
    fn new(process: RunningProcess) -> Self {
        Self {
            process,
            stdout: OutputStream::new(),
            stderr: OutputStream::new(),
            stop_requested: false,
        }
    }

    fn feed(&mut self, stream: StreamKind, text: &str) -> Vec<OutputEvent> {
        match stream {
            StreamKind::Stdout => self.stdout.update(text),
            StreamKind::Stderr => self.stderr.update(text),
        }
    }

    fn send(&mut self, command: &DebuggerCommand) -> bool {
        self.process.write_line(&command.to_string())
    }
}

/// One target's build/debug session.
#[derive(Debug)]
pub struct DebugSession {
    config: SessionConfig,
    launcher: Arc<dyn ProcessLauncher>,
    state: SessionState,
    diagnostics: DiagnosticsSink,
    breakpoints: BreakpointSet,
    debugger: Option<AttachedDebugger>,
    events: mpsc::UnboundedSender<SessionEvent>,
    reported_missing: HashSet<ToolKind>,
}

impl DebugSession {
    pub fn new(
        config: SessionConfig,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            config,
            launcher,
            state: SessionState::Initial,
            diagnostics: DiagnosticsSink::new(),
            breakpoints: BreakpointSet::new(),
            debugger: None,
            events,
            reported_missing: HashSet::new(),
        };
        (session, rx)
    }

    /// A session that spawns real processes.
    pub fn with_system_launcher(
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::new(config, Arc::new(SystemLauncher))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &DiagnosticsSink {
        &self.diagnostics
    }

    pub fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    pub fn breakpoints_mut(&mut self) -> &mut BreakpointSet {
        &mut self.breakpoints
    }

    /// See [`BreakpointSet::toggle`]. Takes effect on the next launch.
    pub fn toggle_breakpoint(&mut self, file: &str, line: u32) -> bool {
        self.breakpoints.toggle(file, line)
    }

    /// Whether a debugger process is still attached (it may be winding down).
    pub fn has_debugger(&self) -> bool {
        self.debugger.is_some()
    }

    pub fn clear_console(&self) {
        self.emit(SessionEvent::ConsoleCleared);
    }

    /// Builds `target`. On success the session returns to `initial`, as it
    /// does when the build tool is missing; see [`BuildOutcome`].
    pub async fn build(&mut self, target: &Target) -> BuildOutcome {
        self.begin_cycle().await;
        let outcome = self.build_target(target).await;
        self.transition(match outcome {
            BuildOutcome::Success => Trigger::BuildSucceeded,
            BuildOutcome::Failure { .. } => Trigger::BuildFailed,
            BuildOutcome::ToolMissing => Trigger::ToolMissing,
        });
        outcome
    }

    /// Builds `target` and, only if that succeeds, launches it under the
    /// debugger with the enabled breakpoints set. Returns the build outcome.
    ///
    /// Debugger output is processed by [`pump`](Self::pump) afterwards.
    pub async fn run_after_build(&mut self, target: &Target) -> BuildOutcome {
        self.begin_cycle().await;
        let outcome = self.build_target(target).await;
        match outcome {
            BuildOutcome::Success => self.launch_debugger(target),
            BuildOutcome::Failure { .. } => {
                self.transition(Trigger::BuildFailed);
            }
            BuildOutcome::ToolMissing => {
                self.transition(Trigger::ToolMissing);
            }
        }
        outcome
    }

    /// Runs the package tests, narrowed to `target` when it is a test target.
    /// Ends in `exited` whatever the result.
    pub async fn test(&mut self, target: Option<&Target>) -> BuildOutcome {
        self.begin_cycle().await;
        let invocation = self.config.toolchain().test(target);
        let outcome = self.run_tool(invocation).await;
        self.transition(match outcome {
            BuildOutcome::ToolMissing => Trigger::ToolMissing,
            _ => Trigger::TestFinished,
        });
        outcome
    }

    /// Forwards `text` verbatim to the debugger.
    pub fn send_command(&mut self, text: &str) {
        match self.debugger.as_mut() {
            Some(debugger) => {
                debugger.process.write_line(text);
            }
            None => self.console("Program not running"),
        }
    }

    /// Asks the debugger to exit. The state reaches `exited` once the
    /// process is gone, as observed by [`pump`](Self::pump).
    pub fn stop(&mut self) {
        let Some(debugger) = self.debugger.as_mut() else {
            log::debug!("stop() with no debugger attached");
            return;
        };
        if debugger.stop_requested {
            return;
        }
        debugger.stop_requested = true;
        debugger.send(&DebuggerCommand::Exit);
        self.transition(Trigger::StopRequested);
    }

    /// Sends a stepping command. Only valid while `paused`; returns whether
    /// the command was sent.
    pub fn step(&mut self, kind: StepKind) -> bool {
        if self.state != SessionState::Paused {
            log::debug!("Ignoring step {:?} in state {}", kind, self.state);
            return false;
        }
        match self.debugger.as_mut() {
            Some(debugger) => debugger.send(&DebuggerCommand::Step(kind)),
            None => false,
        }
    }

    /// Terminates the debugger immediately. The exit is still reported
    /// through [`pump`](Self::pump).
    pub fn kill(&mut self) {
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.stop_requested = true;
            debugger.process.kill();
        }
    }

    /// Processes the next chunk of debugger output. Returns `false` once no
    /// debugger is attached.
    ///
    /// Cancel safe: nothing is lost if the future is dropped before it
    /// completes.
    pub async fn pump(&mut self) -> bool {
        let Some(debugger) = self.debugger.as_mut() else {
            return false;
        };
        match debugger.process.next_event().await {
            Some(ProcessEvent::Output { stream, text }) => {
                let events = debugger.feed(stream, &text);
                self.route_debugger_events(events);
                true
            }
            Some(ProcessEvent::Exited(code)) => {
                self.detach_debugger(code);
                false
            }
            None => {
                self.detach_debugger(ExitCode::UNKNOWN);
                false
            }
        }
    }

    pub async fn run_until_exit(&mut self) {
        while self.pump().await {}
    }

    /// Cooperative stop with a hard fallback: sends `exit`, waits up to
    /// `grace` for the debugger to go away, then kills it.
    pub async fn stop_and_wait(&mut self, grace: Duration) {
        if self.debugger.is_none() {
            return;
        }
        self.stop();
        if tokio::time::timeout(grace, self.run_until_exit()).await.is_ok() {
            return;
        }

        log::warn!("Debugger still running after {:?}; killing it", grace);
        self.kill();
        if tokio::time::timeout(grace, self.run_until_exit()).await.is_err() {
            log::error!("Debugger did not report its exit after kill; detaching");
            self.detach_debugger(ExitCode::UNKNOWN);
        }
    }

    async fn begin_cycle(&mut self) {
        // Two debuggers for one session must never coexist.
        let grace = self.config.stop_grace();
        self.stop_and_wait(grace).await;
        self.diagnostics.clear();
        self.emit(SessionEvent::DiagnosticsReset);
        self.transition(Trigger::CycleStarted);
    }

    async fn build_target(&mut self, target: &Target) -> BuildOutcome {
        let invocation = self.config.toolchain().build(target);
        self.run_tool(invocation).await
    }

    /// Runs a build-tool process to completion, routing its output.
    async fn run_tool(&mut self, invocation: Invocation) -> BuildOutcome {
        let mut process = match self.launcher.launch(&invocation) {
            Ok(process) => process,
            Err(err) => {
                self.report_missing(invocation.tool, &err);
                return BuildOutcome::ToolMissing;
            }
        };

        let mut stdout = OutputStream::new();
        let mut stderr = OutputStream::new();
        let code = loop {
            match process.next_event().await {
                Some(ProcessEvent::Output { stream, text }) => {
                    let events = match stream {
                        StreamKind::Stdout => stdout.update(&text),
                        StreamKind::Stderr => stderr.update(&text),
                    };
                    self.route_build_events(events);
                }
                Some(ProcessEvent::Exited(code)) => break code,
                None => break process.exit_code().unwrap_or(ExitCode::UNKNOWN),
            }
        };
        self.route_build_events(stdout.finish());
        self.route_build_events(stderr.finish());

        self.console(format!("built with code : {code}"));
        BuildOutcome::from_exit(code)
    }

    fn launch_debugger(&mut self, target: &Target) {
        let executable = target.resolve_executable(&self.config.package_path);
        let invocation = self.config.debugger().launch(&executable);
        self.transition(Trigger::DebuggerStarted);

        let process = match self.launcher.launch(&invocation) {
            Ok(process) => process,
            Err(err) => {
                self.report_missing(ToolKind::Debugger, &err);
                self.transition(Trigger::ToolMissing);
                return;
            }
        };

        let mut debugger = AttachedDebugger::new(process);
        for command in self.breakpoints.commands() {
            debugger.send(&command);
        }
        debugger.send(&DebuggerCommand::Run);
        self.debugger = Some(debugger);
    }

    fn detach_debugger(&mut self, code: ExitCode) {
        let Some(debugger) = self.debugger.take() else {
            return;
        };
        let AttachedDebugger { stdout, stderr, .. } = debugger;
        self.route_debugger_events(stdout.finish());
        self.route_debugger_events(stderr.finish());

        self.console(format!("exit code: {code}"));
        self.transition(Trigger::ProcessExited);
    }

    fn route_build_events(&mut self, events: Vec<OutputEvent>) {
        for event in events {
            match event.payload {
                EventPayload::PlainLine { text } => self.console(text),
                EventPayload::Lifecycle { .. } => {
                    log::debug!("Ignoring debugger lifecycle line in build output");
                }
                payload => {
                    if let Some(diagnostic) = payload.to_diagnostic() {
                        self.diagnostics.record(diagnostic.clone());
                        self.emit(SessionEvent::Diagnostic(diagnostic));
                    }
                }
            }
        }
    }

    fn route_debugger_events(&mut self, events: Vec<OutputEvent>) {
        for event in events {
            match event.payload {
                EventPayload::PlainLine { text } => self.console(text),
                EventPayload::Lifecycle {
                    process,
                    transition,
                } => {
                    log::debug!("Debuggee {} {:?}", process, transition);
                    self.transition(Trigger::from(transition));
                    if transition == Lifecycle::Exited {
                        self.finish_debugger();
                    }
                }
                payload => {
                    if let Some(diagnostic) = payload.to_diagnostic() {
                        self.console(diagnostic.to_string());
                    }
                }
            }
        }
    }

    /// The debuggee is gone; tell the debugger to exit as well.
    fn finish_debugger(&mut self) {
        if let Some(debugger) = self.debugger.as_mut()
            && !debugger.stop_requested
        {
            debugger.stop_requested = true;
            debugger.send(&DebuggerCommand::Exit);
        }
    }

    fn report_missing(&mut self, tool: ToolKind, err: &LaunchError) {
        if self.reported_missing.insert(tool) {
            log::error!("{} is unavailable: {}", tool, err);
            self.emit(SessionEvent::ToolMissing {
                tool,
                program: err.program().to_path_buf(),
                detail: err.to_string(),
            });
        } else {
            log::warn!("{} still unavailable: {}", tool, err);
        }
    }

    fn transition(&mut self, trigger: Trigger) {
        let old = self.state;
        match old.next(trigger) {
            Some(new) if new != old => {
                log::debug!("Session {} -> {} on {:?}", old, new, trigger);
                self.state = new;
                self.emit(SessionEvent::StateChanged { old, new });
            }
            Some(_) => {}
            None => log::warn!("Ignoring {:?} in state {}", trigger, old),
        }
    }

    fn console(&self, line: impl Into<String>) {
        self.emit(SessionEvent::Console(line.into()));
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests;
