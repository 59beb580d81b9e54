use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte range of a classified line within the stream it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the same span moved `offset` bytes forward.
    pub fn shifted(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub span: Span,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum EventPayload {
    /// `<file>:<line>:<column>: <error|warning>: <message>`
    CompilerDiagnostic {
        file: String,
        line: u32,
        column: u32,
        severity: Severity,
        message: String,
    },
    /// `<file>:<line>: error: <test> : <kind> failed[: <reason>][ - <comment>]`
    TestFailure {
        file: String,
        line: u32,
        test: String,
        kind: String,
        reason: Option<String>,
    },
    /// `Process <id> launched|stopped|resumed|exited`
    Lifecycle {
        process: String,
        transition: Lifecycle,
    },
    PlainLine {
        text: String,
    },
}

impl EventPayload {
    /// Converts diagnostic-bearing payloads into a [`Diagnostic`].
    ///
    /// Lifecycle markers and plain lines yield `None`.
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        match self {
            EventPayload::CompilerDiagnostic {
                file,
                line,
                column,
                severity,
                message,
            } => Some(Diagnostic {
                file: file.clone(),
                line: *line,
                column: *column,
                severity: *severity,
                message: message.clone(),
            }),
            EventPayload::TestFailure {
                file,
                line,
                test,
                kind,
                reason,
            } => {
                let message = match reason {
                    Some(reason) => format!("{test}: {kind} failed: {reason}"),
                    None => format!("{test}: {kind} failed"),
                };
                Some(Diagnostic {
                    file: file.clone(),
                    line: *line,
                    column: 0,
                    severity: Severity::TestFailure,
                    message,
                })
            }
            EventPayload::Lifecycle { .. } | EventPayload::PlainLine { .. } => None,
        }
    }
}

/// Debuggee status change announced by the debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    Launched,
    Stopped,
    Resumed,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    TestFailure,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::TestFailure => write!(f, "test failure"),
        }
    }
}

/// A structured compiler or test message.
///
/// `column` is 0 when the tool did not report one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.line, self.column, self.severity, self.message
        )
    }
}
