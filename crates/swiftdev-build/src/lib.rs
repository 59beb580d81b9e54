use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub mod command;
pub mod target;
pub mod toolchain;

pub use command::{DebuggerCommand, StepKind};
pub use target::{Target, TargetKind};
pub use toolchain::{Debugger, SwiftToolchain};

/// The role a child process plays in a session.
///
/// A session runs at most one process per role at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    /// `swift build` / `swift test`.
    Build,
    /// `lldb`.
    Debugger,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Build => write!(f, "swift"),
            ToolKind::Debugger => write!(f, "lldb"),
        }
    }
}

/// A fully resolved external command, ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub tool: ToolKind,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(tool: ToolKind, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            tool,
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
