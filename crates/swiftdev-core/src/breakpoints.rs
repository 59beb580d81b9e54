use serde::{Deserialize, Serialize};
use swiftdev_build::DebuggerCommand;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub file: String,
    pub line: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Breakpoint {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
            enabled: true,
        }
    }

    pub fn command(&self) -> DebuggerCommand {
        DebuggerCommand::SetBreakpoint {
            file: self.file.clone(),
            line: self.line,
        }
    }

    fn is_at(&self, file: &str, line: u32) -> bool {
        self.file == file && self.line == line
    }
}

/// User breakpoints, in insertion order. At most one entry per (file, line).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointSet {
    entries: Vec<Breakpoint>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a breakpoint at (file, line), or removes the existing one.
    /// Returns `true` when a breakpoint was added.
    pub fn toggle(&mut self, file: &str, line: u32) -> bool {
        if let Some(pos) = self.entries.iter().position(|b| b.is_at(file, line)) {
            self.entries.remove(pos);
            false
        } else {
            self.entries.push(Breakpoint::new(file, line));
            true
        }
    }

    pub fn contains(&self, file: &str, line: u32) -> Option<&Breakpoint> {
        self.entries.iter().find(|b| b.is_at(file, line))
    }

    pub fn all(&self) -> &[Breakpoint] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns `false` if there is no breakpoint at (file, line).
    pub fn set_enabled(&mut self, file: &str, line: u32, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|b| b.is_at(file, line)) {
            Some(bp) => {
                bp.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.iter().filter(|b| b.enabled)
    }

    /// The `b <file>:<line>` commands sent to a freshly launched debugger.
    pub fn commands(&self) -> Vec<DebuggerCommand> {
        self.enabled().map(Breakpoint::command).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
