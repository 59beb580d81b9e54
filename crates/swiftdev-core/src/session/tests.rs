use super::*;
use crate::runner::{ScriptStep, ScriptedLauncher};
use swiftdev_build::TargetKind;
use swiftdev_log::ir::Severity;

const GRACE: Duration = Duration::from_millis(100);

fn config() -> SessionConfig {
    SessionConfig {
        swift: "swift".into(),
        lldb: "lldb".into(),
        package_path: "/work/Demo".into(),
        use_builder: false,
        stop_grace_ms: 100,
    }
}

fn scripted() -> (
    DebugSession,
    mpsc::UnboundedReceiver<SessionEvent>,
    ScriptedLauncher,
) {
    let launcher = ScriptedLauncher::new();
    let (session, events) = DebugSession::new(config(), Arc::new(launcher.clone()));
    (session, events, launcher)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged { new, .. } => Some(*new),
            _ => None,
        })
        .collect()
}

fn console(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Console(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

fn demo() -> Target {
    Target::executable("Demo")
}

#[tokio::test]
async fn test_build_routes_diagnostics_and_console() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(
        ToolKind::Build,
        vec![
            ScriptStep::stdout("Compiling Demo main.swift\n"),
            ScriptStep::stderr("Sources/Demo/main.swift:3:5: err"),
            ScriptStep::stderr("or: missing return\n"),
            ScriptStep::exit(1),
        ],
    );

    let outcome = session.build(&demo()).await;
    assert_eq!(outcome, BuildOutcome::Failure { code: Some(1) });
    assert_eq!(session.state(), SessionState::BuildFailed);

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![SessionState::Building, SessionState::BuildFailed]
    );
    assert_eq!(
        console(&events),
        vec!["Compiling Demo main.swift", "built with code : 1"]
    );

    let recorded = session.diagnostics().get("Sources/Demo/main.swift");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].line, 3);
    assert_eq!(recorded[0].column, 5);
    assert_eq!(recorded[0].severity, Severity::Error);
    assert_eq!(recorded[0].message, "missing return");
    assert!(events.contains(&SessionEvent::Diagnostic(recorded[0].clone())));

    let invocation = &launcher.launches()[0];
    assert_eq!(invocation.args, vec!["build", "--product", "Demo"]);
}

#[tokio::test]
async fn test_successful_build_returns_to_initial() {
    let (mut session, mut rx, _launcher) = scripted();

    assert!(session.build(&demo()).await.is_success());
    assert_eq!(session.state(), SessionState::Initial);
    assert!(!session.has_debugger());

    let events = drain(&mut rx);
    assert_eq!(events[0], SessionEvent::DiagnosticsReset);
    assert_eq!(
        states(&events),
        vec![SessionState::Building, SessionState::Initial]
    );
}

#[tokio::test]
async fn test_diagnostics_do_not_leak_across_cycles() {
    let (mut session, _rx, launcher) = scripted();
    launcher.push(
        ToolKind::Build,
        vec![
            ScriptStep::stdout("a.swift:1:1: warning: unused\n"),
            ScriptStep::exit(0),
        ],
    );

    session.build(&demo()).await;
    assert_eq!(session.diagnostics().len(), 1);

    session.build(&demo()).await;
    assert!(session.diagnostics().is_empty());
}

#[tokio::test]
async fn test_cancelled_build_leaves_no_stale_diagnostics() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(
        ToolKind::Build,
        vec![
            ScriptStep::stderr("Sources/Demo/main.swift:3:5: error: missing return\n"),
            ScriptStep::Hang,
        ],
    );

    let cancelled = tokio::time::timeout(Duration::from_millis(50), session.build(&demo())).await;
    assert!(cancelled.is_err());
    assert_eq!(session.state(), SessionState::Building);
    assert_eq!(session.diagnostics().len(), 1);

    assert!(session.build(&demo()).await.is_success());
    assert!(session.diagnostics().is_empty());
    assert_eq!(session.state(), SessionState::Initial);

    let events = drain(&mut rx);
    let last_reset = events
        .iter()
        .rposition(|e| *e == SessionEvent::DiagnosticsReset)
        .unwrap();
    assert!(events[..last_reset]
        .iter()
        .any(|e| matches!(e, SessionEvent::Diagnostic(_))));
    assert!(!events[last_reset..]
        .iter()
        .any(|e| matches!(e, SessionEvent::Diagnostic(_))));
    assert_eq!(
        states(&events),
        vec![SessionState::Building, SessionState::Initial]
    );
}

#[tokio::test]
async fn test_build_outcome_tells_missing_tool_from_success() {
    let (mut session, _rx, launcher) = scripted();
    launcher.push_missing(ToolKind::Build);

    let missing = session.build(&demo()).await;
    assert_eq!(session.state(), SessionState::Initial);
    let built = session.build(&demo()).await;
    assert_eq!(session.state(), SessionState::Initial);

    assert_eq!(missing, BuildOutcome::ToolMissing);
    assert!(!missing.is_success());
    assert_eq!(built, BuildOutcome::Success);
}

#[tokio::test]
async fn test_launch_and_pause_states() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(
        ToolKind::Debugger,
        vec![
            ScriptStep::await_line("r"),
            ScriptStep::stdout("Process 123 launched\n"),
            ScriptStep::stdout("Process 123 stopped\n"),
            ScriptStep::Hang,
        ],
    );

    session.run_after_build(&demo()).await;
    assert_eq!(session.state(), SessionState::Launching);
    let before = drain(&mut rx);
    assert_eq!(
        states(&before),
        vec![SessionState::Building, SessionState::Launching]
    );

    while session.state() != SessionState::Paused {
        assert!(session.pump().await);
    }

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![SessionState::Running, SessionState::Paused]
    );
    assert!(console(&events).is_empty());

    session.stop_and_wait(GRACE).await;
    assert_eq!(session.state(), SessionState::Exited);
}

#[tokio::test]
async fn test_end_to_end_without_breakpoints() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(ToolKind::Build, vec![ScriptStep::exit(0)]);
    launcher.push(
        ToolKind::Debugger,
        vec![
            ScriptStep::stdout("(lldb) target create \"/work/Demo/.build/debug/Demo\"\n"),
            ScriptStep::stdout("Current executable set to '/work/Demo/.build/debug/Demo' (x86_64).\n"),
            ScriptStep::await_line("r"),
            ScriptStep::stdout("Process 55 launched: '/work/Demo/.build/debug/Demo' (x86_64)\n"),
            ScriptStep::stdout("Hello, world!\n"),
            ScriptStep::stdout("Process 55 exited with status = 0 (0x00000000)\n"),
            ScriptStep::await_line("exit"),
            ScriptStep::exit(0),
        ],
    );

    assert!(session.run_after_build(&demo()).await.is_success());
    session.run_until_exit().await;

    assert_eq!(session.state(), SessionState::Exited);
    assert!(!session.has_debugger());
    assert!(session.diagnostics().is_empty());

    let written = launcher.written(ToolKind::Debugger);
    assert!(written.iter().all(|line| !line.starts_with("b ")));
    assert_eq!(written, vec!["r", "exit"]);

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![
            SessionState::Building,
            SessionState::Launching,
            SessionState::Running,
            SessionState::Exited,
        ]
    );
    assert_eq!(
        console(&events),
        vec!["built with code : 0", "Hello, world!", "exit code: 0"]
    );

    let debugger = &launcher.launches()[1];
    assert_eq!(debugger.tool, ToolKind::Debugger);
    assert_eq!(debugger.args, vec!["/work/Demo/.build/debug/Demo"]);
}

#[tokio::test]
async fn test_only_enabled_breakpoints_are_sent() {
    let (mut session, _rx, launcher) = scripted();
    assert!(session.toggle_breakpoint("main.swift", 3));
    session.toggle_breakpoint("main.swift", 8);
    session.toggle_breakpoint("util.swift", 1);
    session.breakpoints_mut().set_enabled("main.swift", 8, false);

    session.run_after_build(&demo()).await;
    session.run_until_exit().await;

    assert_eq!(
        launcher.written(ToolKind::Debugger),
        vec!["b main.swift:3", "b util.swift:1", "r"]
    );
}

#[tokio::test]
async fn test_failed_build_never_launches_debugger() {
    let (mut session, _rx, launcher) = scripted();
    launcher.push(ToolKind::Build, vec![ScriptStep::exit(65)]);

    let outcome = session.run_after_build(&demo()).await;
    assert_eq!(outcome, BuildOutcome::Failure { code: Some(65) });
    assert_eq!(session.state(), SessionState::BuildFailed);
    assert!(!session.has_debugger());
    assert_eq!(launcher.launches().len(), 1);
}

#[tokio::test]
async fn test_missing_build_tool_reported_once() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push_missing(ToolKind::Build);
    launcher.push_missing(ToolKind::Build);

    for _ in 0..2 {
        assert_eq!(session.build(&demo()).await, BuildOutcome::ToolMissing);
        assert_eq!(session.state(), SessionState::Initial);
    }

    let events = drain(&mut rx);
    let missing = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::ToolMissing { .. }))
        .count();
    assert_eq!(missing, 1);
    assert!(!console(&events).iter().any(|l| l.starts_with("built with code")));
}

#[tokio::test]
async fn test_missing_tool_with_real_launcher() {
    let config = SessionConfig {
        swift: "/definitely/not/installed/swift".into(),
        ..config()
    };
    let (mut session, mut rx) = DebugSession::with_system_launcher(config);

    session.build(&demo()).await;
    session.build(&demo()).await;
    assert_eq!(session.state(), SessionState::Initial);

    let events = drain(&mut rx);
    let missing: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::ToolMissing { tool, program, .. } => Some((*tool, program.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        missing,
        vec![(
            ToolKind::Build,
            PathBuf::from("/definitely/not/installed/swift")
        )]
    );
}

#[tokio::test]
async fn test_missing_debugger_ends_exited() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push_missing(ToolKind::Debugger);

    assert!(session.run_after_build(&demo()).await.is_success());
    assert_eq!(session.state(), SessionState::Exited);
    assert!(!session.has_debugger());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ToolMissing {
            tool: ToolKind::Debugger,
            ..
        }
    )));

    // A later cycle still works.
    assert!(session.build(&demo()).await.is_success());
    assert_eq!(session.state(), SessionState::Initial);
}

#[tokio::test]
async fn test_stop_from_paused_reaches_exited() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(
        ToolKind::Debugger,
        vec![
            ScriptStep::await_line("r"),
            ScriptStep::stdout("Process 9 launched\nProcess 9 stopped\n"),
            ScriptStep::await_line("exit"),
            ScriptStep::stdout("Process 9 exited with status = 9 (0x00000009)\n"),
            ScriptStep::exit(0),
        ],
    );

    session.run_after_build(&demo()).await;
    session.pump().await;
    assert_eq!(session.state(), SessionState::Paused);
    drain(&mut rx);

    session.stop();
    assert_eq!(session.state(), SessionState::Exiting);
    session.run_until_exit().await;
    assert_eq!(session.state(), SessionState::Exited);

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![SessionState::Exiting, SessionState::Exited]
    );
    assert_eq!(launcher.written(ToolKind::Debugger), vec!["r", "exit"]);
}

#[tokio::test]
async fn test_stop_kills_unresponsive_debugger() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(
        ToolKind::Debugger,
        vec![
            ScriptStep::stdout("Process 3 launched\n"),
            ScriptStep::Hang,
        ],
    );

    session.run_after_build(&demo()).await;
    session.pump().await;
    assert_eq!(session.state(), SessionState::Running);

    session.stop_and_wait(GRACE).await;
    assert_eq!(session.state(), SessionState::Exited);
    assert!(!session.has_debugger());
    assert!(console(&drain(&mut rx)).contains(&"exit code: unknown".to_string()));
}

#[tokio::test]
async fn test_new_cycle_tears_down_previous_debugger() {
    let (mut session, _rx, launcher) = scripted();
    launcher.push(
        ToolKind::Debugger,
        vec![
            ScriptStep::stdout("Process 1 launched\n"),
            ScriptStep::await_line("exit"),
            ScriptStep::exit(0),
        ],
    );

    session.run_after_build(&demo()).await;
    session.pump().await;
    assert_eq!(session.state(), SessionState::Running);

    // Second cycle: the first debugger must be gone before the build starts.
    assert!(session.build(&demo()).await.is_success());
    assert!(!session.has_debugger());
    assert_eq!(session.state(), SessionState::Initial);
    assert_eq!(launcher.written(ToolKind::Debugger), vec!["r", "exit"]);
}

#[tokio::test]
async fn test_step_only_when_paused() {
    let (mut session, _rx, launcher) = scripted();
    launcher.push(
        ToolKind::Debugger,
        vec![
            ScriptStep::stdout("Process 4 launched\n"),
            ScriptStep::stdout("Process 4 stopped\n"),
            ScriptStep::Hang,
        ],
    );

    assert!(!session.step(StepKind::Over));

    session.run_after_build(&demo()).await;
    session.pump().await;
    assert_eq!(session.state(), SessionState::Running);
    assert!(!session.step(StepKind::Over));

    session.pump().await;
    assert_eq!(session.state(), SessionState::Paused);
    assert!(session.step(StepKind::Over));
    assert!(session.step(StepKind::Out));
    assert!(session.step(StepKind::Resume));

    assert_eq!(
        launcher.written(ToolKind::Debugger),
        vec!["r", "next", "finish", "continue"]
    );
    session.kill();
    session.run_until_exit().await;
    assert_eq!(session.state(), SessionState::Exited);
}

#[tokio::test]
async fn test_send_command_without_debugger() {
    let (mut session, mut rx, _launcher) = scripted();
    session.send_command("frame variable");
    session.stop();

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![SessionEvent::Console("Program not running".into())]
    );
    assert_eq!(session.state(), SessionState::Initial);
}

#[tokio::test]
async fn test_send_command_is_verbatim() {
    let (mut session, _rx, launcher) = scripted();
    launcher.push(ToolKind::Debugger, vec![ScriptStep::Hang]);

    session.run_after_build(&demo()).await;
    session.send_command("  frame variable  ");
    session.stop_and_wait(GRACE).await;

    assert_eq!(
        launcher.written(ToolKind::Debugger),
        vec!["r", "  frame variable  ", "exit"]
    );
}

#[tokio::test]
async fn test_test_cycle_records_failures() {
    let (mut session, mut rx, launcher) = scripted();
    launcher.push(
        ToolKind::Build,
        vec![
            ScriptStep::stdout("Test Suite 'All tests' started\n"),
            ScriptStep::stdout(
                "/work/Demo/Tests/DemoTests/DemoTests.swift:12: error: -[DemoTests.DemoTests testAdd] : XCTAssertEqual failed: (\"1\") is not equal to (\"2\")\n",
            ),
            ScriptStep::exit(1),
        ],
    );

    let target = Target::new("DemoTests", TargetKind::Test);
    let outcome = session.test(Some(&target)).await;
    assert_eq!(outcome, BuildOutcome::Failure { code: Some(1) });
    assert_eq!(session.state(), SessionState::Exited);

    let failures = session
        .diagnostics()
        .get("/work/Demo/Tests/DemoTests/DemoTests.swift");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::TestFailure);
    assert_eq!(failures[0].line, 12);

    assert_eq!(
        launcher.launches()[0].args,
        vec!["test", "--filter", "DemoTests"]
    );
    assert_eq!(
        states(&drain(&mut rx)),
        vec![SessionState::Building, SessionState::Exited]
    );
}

#[tokio::test]
async fn test_clear_console() {
    let (session, mut rx, _launcher) = scripted();
    session.clear_console();
    assert_eq!(drain(&mut rx), vec![SessionEvent::ConsoleCleared]);
}
