//! # swiftdev Output Classifier
//!
//! Turns the raw text streams of `swift build`, `swift test` and `lldb` into
//! typed [`OutputEvent`](ir::OutputEvent)s.
//!
//! ## Overview
//!
//! The external tools only speak text. This crate recognises the handful of
//! line formats that matter to a build/debug session:
//!
//! - **Compiler diagnostics**: `<file>:<line>:<column>: error|warning: <message>`
//! - **Test failures**: `<file>:<line>: error: <test> : <kind> failed[: <reason>][ - <comment>]`
//! - **Debugger lifecycle**: `Process <id> launched|stopped|resumed|exited`
//! - **Debugger echoes**: `target create`, `b file:line` and friends, which are dropped
//!
//! Everything else is passed through verbatim as a `PlainLine`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     update()      ┌──────────────┐   classify()   ┌─────────┐
//! │ stdout chunk │ ────────────────► │ OutputStream │ ─────────────► │ rules   │
//! │ (any split)  │ ◄──────────────── │ (line buffer)│ ◄───────────── │ (pure)  │
//! └──────────────┘  Vec<OutputEvent> └──────────────┘                └─────────┘
//!                                          │
//!                                          │ finish()
//!                                          ▼
//!                                    trailing line
//! ```
//!
//! [`classify`](classifier::classify) is a pure function over complete text.
//! [`OutputStream`](stream::OutputStream) owns the partial-line buffer for a
//! single physical stream; keep one per stream so stdout and stderr never
//! splice into each other.
//!
//! ## Examples
//!
//! ```
//! use swiftdev_log::{classify, ir::{EventPayload, Severity}};
//!
//! let events = classify("a.swift:3:5: error: missing return\n");
//! assert_eq!(events.len(), 1);
//! match &events[0].payload {
//!     EventPayload::CompilerDiagnostic { file, line, column, severity, message } => {
//!         assert_eq!(file, "a.swift");
//!         assert_eq!((*line, *column), (3, 5));
//!         assert_eq!(*severity, Severity::Error);
//!         assert_eq!(message, "missing return");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ### Streaming
//!
//! ```
//! use swiftdev_log::OutputStream;
//!
//! let mut stream = OutputStream::new();
//! assert!(stream.update("Process 12 laun").is_empty());
//! let events = stream.update("ched\n");
//! assert_eq!(events.len(), 1);
//! let trailing = stream.finish();
//! assert!(trailing.is_empty());
//! ```
//!
//! ## Schema Versioning
//!
//! The IR serializes as `{"span": .., "kind": .., "data": ..}`; see
//! [`SCHEMA_VERSION`].

/// Typed event Intermediate Representation (IR).
pub mod ir;
/// Pure line classification rules.
pub mod classifier;
/// Chunk reassembly on top of the classifier.
pub mod stream;


pub use classifier::{classify, classify_line};
pub use stream::OutputStream;

/// Schema version for the serialized event IR.
///
/// - MAJOR: Breaking changes to event structure
/// - MINOR: New optional fields or event types
/// - PATCH: Bug fixes to classification behavior
pub const SCHEMA_VERSION: &str = "1.0.0";
