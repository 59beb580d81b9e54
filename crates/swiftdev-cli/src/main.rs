use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use swiftdev_build::{StepKind, Target, TargetKind};
use swiftdev_core::{BuildOutcome, DebugSession, SessionConfig, SessionEvent};
use swiftdev_log::OutputStream;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "swiftdev")]
#[command(about = "Build, test and debug Swift packages", long_about = None)]
struct Cli {
    /// Root of the Swift package
    #[arg(long, global = true, value_name = "DIR")]
    package_path: Option<PathBuf>,

    /// Path to the swift executable
    #[arg(long, global = true, value_name = "PATH")]
    swift: Option<PathBuf>,

    /// Path to the lldb executable
    #[arg(long, global = true, value_name = "PATH")]
    lldb: Option<PathBuf>,

    /// Configuration file to use instead of <package>/.swiftdev.json
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Build and test through `swift run builder`
    #[arg(long, global = true)]
    use_builder: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a captured swift/lldb log and emit JSON events
    Classify {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Build a product
    Build {
        #[arg(value_name = "TARGET")]
        target: String,
    },
    /// Run the package tests, optionally only one test target
    Test {
        #[arg(value_name = "TARGET")]
        target: Option<String>,
    },
    /// Build a product and run it under lldb.
    ///
    /// Lines typed on stdin are sent to lldb verbatim. `:into`, `:over`,
    /// `:out` and `:resume` step while paused; `:stop` or end of input ends
    /// the session.
    Debug {
        #[arg(value_name = "TARGET")]
        target: String,
        /// Breakpoint to set before running
        #[arg(long = "break", value_name = "FILE:LINE")]
        breakpoints: Vec<String>,
        /// Executable to debug instead of .build/debug/<TARGET>
        #[arg(long, value_name = "PATH")]
        exe: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Commands::Classify { path } = &cli.command {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let events = OutputStream::new().parse(&content);
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let grace = config.stop_grace();
    let (mut session, events) = DebugSession::with_system_launcher(config);
    let printer = spawn_printer(events);

    let code = match cli.command {
        Commands::Classify { .. } => 0,
        Commands::Build { target } => {
            let outcome = session.build(&Target::executable(&target)).await;
            exit_status(outcome)
        }
        Commands::Test { target } => {
            let target = target.map(|name| Target::new(&name, TargetKind::Test));
            let outcome = session.test(target.as_ref()).await;
            exit_status(outcome)
        }
        Commands::Debug {
            target,
            breakpoints,
            exe,
        } => {
            for spec in &breakpoints {
                let (file, line) = parse_breakpoint(spec)?;
                session.toggle_breakpoint(&file, line);
            }
            let mut target = Target::executable(&target);
            if let Some(exe) = exe {
                target = target.with_executable_path(exe);
            }
            debug(&mut session, &target, grace).await
        }
    };

    // Closing the event channel lets the printer finish.
    drop(session);
    printer.await?;
    Ok(ExitCode::from(code))
}

fn load_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let package_path = cli
        .package_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::discover(&package_path)?,
    };
    if let Some(path) = &cli.package_path {
        config.package_path = path.clone();
    }
    if let Some(swift) = &cli.swift {
        config.swift = swift.clone();
    }
    if let Some(lldb) = &cli.lldb {
        config.lldb = lldb.clone();
    }
    if cli.use_builder {
        config.use_builder = true;
    }
    log::debug!("Using configuration {:?}", config);
    Ok(config)
}

async fn debug(
    session: &mut DebugSession,
    target: &Target,
    grace: std::time::Duration,
) -> u8 {
    let outcome = session.run_after_build(target).await;
    if !outcome.is_success() {
        return exit_status(outcome);
    }

    let mut input = spawn_stdin_reader();
    let mut stdin_open = true;

    while session.has_debugger() {
        tokio::select! {
            attached = session.pump() => {
                if !attached {
                    break;
                }
            }
            line = input.recv(), if stdin_open => {
                match line {
                    Some(line) if line.trim() == ":stop" => session.stop_and_wait(grace).await,
                    Some(line) => handle_input(session, &line),
                    None => {
                        stdin_open = false;
                        session.stop_and_wait(grace).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.kill();
            }
        }
    }
    0
}

/// Reads stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn handle_input(session: &mut DebugSession, line: &str) {
    match line.trim().strip_prefix(':') {
        Some(step) => match step.parse::<StepKind>() {
            Ok(kind) => {
                if !session.step(kind) {
                    eprintln!("swiftdev: can only step while paused");
                }
            }
            Err(e) => eprintln!("swiftdev: {e}"),
        },
        None => session.send_command(line),
    }
}

fn spawn_printer(mut events: UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Console(line) => println!("{line}"),
                SessionEvent::Diagnostic(diagnostic) => eprintln!("{diagnostic}"),
                SessionEvent::ToolMissing { tool, detail, .. } => {
                    eprintln!("swiftdev: {tool} is not available: {detail}");
                }
                SessionEvent::StateChanged { old, new } => {
                    log::info!("state {old} -> {new}");
                }
                SessionEvent::ConsoleCleared | SessionEvent::DiagnosticsReset => {}
            }
        }
    })
}

/// Parses `FILE:LINE`. The file part may itself contain colons.
fn parse_breakpoint(spec: &str) -> anyhow::Result<(String, u32)> {
    let (file, line) = spec
        .rsplit_once(':')
        .with_context(|| format!("breakpoint '{spec}' is not FILE:LINE"))?;
    let line: u32 = line
        .trim()
        .parse()
        .with_context(|| format!("invalid line number in breakpoint '{spec}'"))?;
    if file.is_empty() {
        anyhow::bail!("breakpoint '{spec}' has no file");
    }
    Ok((file.to_string(), line))
}

/// Process exit status mirroring the tool's; 127 when it could not run.
fn exit_status(outcome: BuildOutcome) -> u8 {
    match outcome {
        BuildOutcome::Success => 0,
        BuildOutcome::Failure { code: Some(code) } => {
            u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
        }
        BuildOutcome::Failure { code: None } => 1,
        BuildOutcome::ToolMissing => 127,
    }
}
