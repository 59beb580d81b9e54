use crate::classifier::classify;
use crate::ir::OutputEvent;

/// A streaming classifier for one physical output stream (stdout or stderr).
///
/// Tool output arrives in arbitrary chunks that need not end on a line
/// boundary. `OutputStream` buffers the unterminated tail of each chunk and
/// only classifies complete lines, so a diagnostic split across two reads is
/// classified exactly once, whole.
#[derive(Debug)]
pub struct OutputStream {
    buffer: String,
    global_offset: usize,
}

impl Default for OutputStream {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStream {
    /// Creates a new, empty `OutputStream`.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            global_offset: 0,
        }
    }

    /// Appends `input` and classifies every line it completes.
    ///
    /// # Returns
    ///
    /// The events for newly completed lines, in stream order. Spans are
    /// absolute offsets into the stream.
    pub fn update(&mut self, input: &str) -> Vec<OutputEvent> {
        self.buffer.push_str(input);

        let Some(last_nl) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let process_len = last_nl + 1;

        let events = self.classify_prefix(process_len);
        self.buffer.drain(..process_len);
        events
    }

    /// Classifies whatever is left in the buffer as a final, unterminated line.
    pub fn finish(mut self) -> Vec<OutputEvent> {
        self.flush()
    }

    /// Like [`finish`](Self::finish), but keeps the stream usable.
    pub fn flush(&mut self) -> Vec<OutputEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let len = self.buffer.len();
        let events = self.classify_prefix(len);
        self.buffer.clear();
        events
    }

    /// Classifies a complete capture in one go.
    pub fn parse(mut self, input: &str) -> Vec<OutputEvent> {
        let mut events = self.update(input);
        events.extend(self.finish());
        events
    }

    /// Bytes received but not yet classified.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn classify_prefix(&mut self, len: usize) -> Vec<OutputEvent> {
        let offset = self.global_offset;
        let events = classify(&self.buffer[..len])
            .into_iter()
            .map(|event| OutputEvent {
                span: event.span.shifted(offset),
                payload: event.payload,
            })
            .collect();
        self.global_offset += len;
        events
    }
}
