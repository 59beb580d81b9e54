use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four stepping controls offered while the debuggee is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    Into,
    Over,
    Out,
    Resume,
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "into" | "in" => Ok(StepKind::Into),
            "over" => Ok(StepKind::Over),
            "out" => Ok(StepKind::Out),
            "resume" | "continue" => Ok(StepKind::Resume),
            other => Err(format!("unknown step kind '{other}'")),
        }
    }
}

/// A line of LLDB's textual command protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    SetBreakpoint { file: String, line: u32 },
    Run,
    Step(StepKind),
    Exit,
    /// Passed through untouched, as typed by the user.
    Raw(String),
}

impl fmt::Display for DebuggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebuggerCommand::SetBreakpoint { file, line } => write!(f, "b {file}:{line}"),
            DebuggerCommand::Run => write!(f, "r"),
            DebuggerCommand::Step(StepKind::Into) => write!(f, "step"),
            DebuggerCommand::Step(StepKind::Over) => write!(f, "next"),
            DebuggerCommand::Step(StepKind::Out) => write!(f, "finish"),
            DebuggerCommand::Step(StepKind::Resume) => write!(f, "continue"),
            DebuggerCommand::Exit => write!(f, "exit"),
            DebuggerCommand::Raw(text) => write!(f, "{text}"),
        }
    }
}
