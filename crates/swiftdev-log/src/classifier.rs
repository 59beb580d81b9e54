use crate::ir::{EventPayload, Lifecycle, OutputEvent, Severity, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static COMPILER_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<file>[^:\s][^:]*):(?P<line>\d+):(?P<column>\d+): (?P<severity>error|warning): (?P<message>.*)$",
    )
    .unwrap()
});

static TEST_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<file>[^:\s][^:]*):(?P<line>\d+): error: (?P<test>.+?) : (?:(?P<kind>\S+) )?failed(?:: (?P<reason>.*?))?(?: - (?P<comment>.*))?$",
    )
    .unwrap()
});

static LIFECYCLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:\(lldb\)\s*)?Process (?P<process>\S+) (?P<marker>launched|stopped|resumed|resuming|exited)\b",
    )
    .unwrap()
});

/// Lines the debugger echoes back while we seed it with commands.
static ECHO: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\s*\(lldb\)\s*target create\b",
        r"^\s*\(lldb\)\s*(?:b|breakpoint set)\s",
        r"^\s*\(lldb\)\s*(?:r|run)\s*$",
        r"^Current executable set to ",
        r"^Breakpoint \d+: ",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Classifies every line of `chunk`.
///
/// The chunk is treated as complete: a trailing segment without a newline is
/// classified as a line of its own. Callers receiving partial chunks should go
/// through [`OutputStream`](crate::OutputStream) instead, which holds partial
/// lines back until they are terminated.
///
/// Spans are relative to the start of `chunk`.
pub fn classify(chunk: &str) -> Vec<OutputEvent> {
    let mut events = Vec::new();
    let mut offset = 0;

    for raw in chunk.split_inclusive('\n') {
        let line = strip_line_ending(raw);
        if let Some(payload) = classify_line(line) {
            events.push(OutputEvent {
                span: Span::new(offset, offset + line.len()),
                payload,
            });
        }
        offset += raw.len();
    }

    events
}

/// Classifies a single logical line (without its terminator).
///
/// Returns `None` for lines that are suppressed entirely, such as debugger
/// command echoes.
pub fn classify_line(line: &str) -> Option<EventPayload> {
    if let Some(caps) = TEST_FAILURE.captures(line)
        && let Ok(line_number) = caps["line"].parse::<u32>()
    {
        // XCTest prints a bare ` - ` when the assertion has no message.
        let present = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim())
                .filter(|text| !text.is_empty())
        };
        let reason = match (present("reason"), present("comment")) {
            (Some(reason), Some(comment)) => Some(format!("{reason} - {comment}")),
            (Some(text), None) | (None, Some(text)) => Some(text.to_string()),
            (None, None) => None,
        };
        return Some(EventPayload::TestFailure {
            file: caps["file"].to_string(),
            line: line_number,
            test: caps["test"].trim().to_string(),
            kind: caps
                .name("kind")
                .map_or_else(|| "test".to_string(), |kind| kind.as_str().to_string()),
            reason,
        });
    }

    if let Some(caps) = COMPILER_DIAGNOSTIC.captures(line)
        && let (Ok(line_number), Ok(column)) = (
            caps["line"].parse::<u32>(),
            caps["column"].parse::<u32>(),
        )
    {
        let severity = match &caps["severity"] {
            "error" => Severity::Error,
            _ => Severity::Warning,
        };
        return Some(EventPayload::CompilerDiagnostic {
            file: caps["file"].to_string(),
            line: line_number,
            column,
            severity,
            message: caps["message"].to_string(),
        });
    }

    if let Some(caps) = LIFECYCLE.captures(line) {
        let transition = match &caps["marker"] {
            "launched" => Lifecycle::Launched,
            "stopped" => Lifecycle::Stopped,
            "exited" => Lifecycle::Exited,
            _ => Lifecycle::Resumed,
        };
        return Some(EventPayload::Lifecycle {
            process: caps["process"].to_string(),
            transition,
        });
    }

    if ECHO.iter().any(|re| re.is_match(line)) {
        return None;
    }

    Some(EventPayload::PlainLine {
        text: line.to_string(),
    })
}

fn strip_line_ending(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}
