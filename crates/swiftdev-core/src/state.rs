//! Session state machine.
//!
//! Every state change of a [`DebugSession`](crate::session::DebugSession)
//! goes through [`SessionState::next`]. Pairs not listed in the table are
//! rejected, which keeps impossible sequences (say, `building -> running`)
//! out of the notification stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use swiftdev_log::ir::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Initial,
    Building,
    BuildFailed,
    Launching,
    Running,
    Paused,
    Exiting,
    Exited,
}

impl SessionState {
    /// A debugger process is (or should be) alive in this state.
    pub fn has_debugger(self) -> bool {
        matches!(
            self,
            SessionState::Launching
                | SessionState::Running
                | SessionState::Paused
                | SessionState::Exiting
        )
    }

    /// Looks up the transition table. `None` means the trigger is not valid
    /// in this state and must be ignored.
    pub fn next(self, trigger: Trigger) -> Option<SessionState> {
        use SessionState as S;
        use Trigger as T;

        let next = match (self, trigger) {
            (S::Initial | S::BuildFailed | S::Exited, T::CycleStarted) => S::Building,
            // A cycle whose future was dropped mid-build.
            (S::Building, T::CycleStarted) => S::Building,

            (S::Building, T::BuildSucceeded) => S::Initial,
            (S::Building, T::BuildFailed) => S::BuildFailed,
            (S::Building, T::ToolMissing) => S::Initial,
            (S::Building, T::TestFinished) => S::Exited,
            (S::Building, T::DebuggerStarted) => S::Launching,

            (S::Launching, T::ToolMissing) => S::Exited,
            (S::Launching | S::Running | S::Paused, T::DebuggeeRunning) => S::Running,
            (S::Running | S::Paused, T::DebuggeePaused) => S::Paused,
            (S::Launching | S::Running | S::Paused, T::StopRequested) => S::Exiting,
            // Late lifecycle lines while the debugger winds down.
            (S::Exiting, T::DebuggeeRunning | T::DebuggeePaused) => S::Exiting,
            (
                S::Launching | S::Running | S::Paused | S::Exiting | S::Exited,
                T::DebuggeeExited | T::ProcessExited,
            ) => S::Exited,

            _ => return None,
        };
        Some(next)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Initial => "initial",
            SessionState::Building => "building",
            SessionState::BuildFailed => "buildFailed",
            SessionState::Launching => "launching",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Exiting => "exiting",
            SessionState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// Something that happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// `build`, `run_after_build` or `test` was called.
    CycleStarted,
    BuildSucceeded,
    BuildFailed,
    /// The build or debugger executable could not be launched.
    ToolMissing,
    /// The test tool exited, whatever its code.
    TestFinished,
    DebuggerStarted,
    DebuggeeRunning,
    DebuggeePaused,
    DebuggeeExited,
    StopRequested,
    /// The debugger process itself exited.
    ProcessExited,
}

impl From<Lifecycle> for Trigger {
    fn from(lifecycle: Lifecycle) -> Self {
        match lifecycle {
            Lifecycle::Launched | Lifecycle::Resumed => Trigger::DebuggeeRunning,
            Lifecycle::Stopped => Trigger::DebuggeePaused,
            Lifecycle::Exited => Trigger::DebuggeeExited,
        }
    }
}
