//! # swiftdev Core
//!
//! Session orchestration for building, testing and debugging Swift packages.
//!
//! ## Overview
//!
//! This crate drives the external tools (`swift build`, `swift test`, `lldb`)
//! for one target at a time and turns their text output into state changes,
//! diagnostics and console lines. It has no user interface of its own; every
//! observable effect is a [`SessionEvent`](session::SessionEvent).
//!
//! ## Modules
//!
//! - [`runner`] - Child process supervision behind the [`ProcessLauncher`](runner::ProcessLauncher) trait
//! - [`session`] - The [`DebugSession`](session::DebugSession) coordinator
//! - [`state`] - The session state table
//! - [`diagnostics`] - Per-file diagnostics for the current cycle
//! - [`breakpoints`] - User breakpoints
//! - [`config`] - Tool locations and tuning, loaded from `.swiftdev.json`
//!
//! ## Design Philosophy
//!
//! - **Testability**: all process interaction goes through a launcher trait, so
//!   sessions run against scripted processes in tests
//! - **Explicit State**: transitions are looked up in one table; anything else
//!   is logged and ignored
//! - **No Orphans**: process handles kill their child when dropped
//!
//! ## Examples
//!
//! ### Building and Running a Target
//!
//! ```no_run
//! use swiftdev_build::Target;
//! use swiftdev_core::config::SessionConfig;
//! use swiftdev_core::session::{DebugSession, SessionEvent};
//!
//! # async fn demo() {
//! let config = SessionConfig::detect();
//! let (mut session, mut events) = DebugSession::with_system_launcher(config);
//!
//! session.toggle_breakpoint("Sources/Demo/main.swift", 12);
//! if session.run_after_build(&Target::executable("Demo")).await.is_success() {
//!     session.run_until_exit().await;
//! }
//!
//! while let Ok(event) = events.try_recv() {
//!     if let SessionEvent::Console(line) = event {
//!         println!("{line}");
//!     }
//! }
//! # }
//! ```
//!
//! ### Testing with a Scripted Launcher
//!
//! ```
//! use std::sync::Arc;
//! use swiftdev_build::{Target, ToolKind};
//! use swiftdev_core::config::SessionConfig;
//! use swiftdev_core::runner::{ScriptStep, ScriptedLauncher};
//! use swiftdev_core::session::DebugSession;
//! use swiftdev_core::state::SessionState;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let launcher = ScriptedLauncher::new();
//! launcher.push(ToolKind::Build, vec![ScriptStep::exit(1)]);
//!
//! let (mut session, _events) = DebugSession::new(SessionConfig::default(), Arc::new(launcher));
//! session.build(&Target::executable("Demo")).await;
//! assert_eq!(session.state(), SessionState::BuildFailed);
//! # });
//! ```

pub mod breakpoints;
pub mod config;
pub mod diagnostics;
pub mod runner;
pub mod session;
pub mod state;

pub use breakpoints::{Breakpoint, BreakpointSet};
pub use config::{ConfigError, SessionConfig};
pub use diagnostics::DiagnosticsSink;
pub use session::{BuildOutcome, DebugSession, SessionEvent};
pub use state::SessionState;
