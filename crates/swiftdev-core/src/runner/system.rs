use super::{ExitCode, LaunchError, ProcessEvent, ProcessLauncher, RunningProcess, StreamKind};
use std::process::Stdio;
use std::time::Duration;
use swiftdev_build::Invocation;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

const READ_BUFFER_SIZE: usize = 8192;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Default implementation of [`ProcessLauncher`] using `tokio::process::Command`.
///
/// Must be called from within a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, invocation: &Invocation) -> Result<RunningProcess, LaunchError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            log::error!("Failed to spawn {}: {}", invocation, e);
            LaunchError::from_io(&invocation.program, e)
        })?;
        let pid = child.id();
        log::info!(
            "Spawned {} (pid {:?}, cwd {:?})",
            invocation,
            pid,
            invocation.working_dir
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

        let readers = [
            child
                .stdout
                .take()
                .map(|out| tokio::spawn(forward_output(out, StreamKind::Stdout, event_tx.clone()))),
            child
                .stderr
                .take()
                .map(|err| tokio::spawn(forward_output(err, StreamKind::Stderr, event_tx.clone()))),
        ];

        if let Some(mut stdin) = child.stdin.take() {
            let tool = invocation.tool;
            tokio::spawn(async move {
                while let Some(line) = input_rx.recv().await {
                    let mut bytes = line.into_bytes();
                    bytes.push(b'\n');
                    if let Err(e) = stdin.write_all(&bytes).await {
                        log::warn!("{} stdin closed: {}", tool, e);
                        break;
                    }
                    if let Err(e) = stdin.flush().await {
                        log::warn!("{} stdin flush failed: {}", tool, e);
                        break;
                    }
                }
            });
        }

        let tool = invocation.tool;
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = &mut kill_rx => {
                    if let Err(e) = child.start_kill() {
                        log::warn!("Failed to kill {}: {}", tool, e);
                    }
                    child.wait().await
                }
            };

            // Exit is reported only after both pipes are drained. A grandchild
            // may keep them open, so the drain is bounded.
            for mut reader in readers.into_iter().flatten() {
                if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
                    log::warn!("{} output still open after exit; discarding the rest", tool);
                    reader.abort();
                }
            }

            let code = match status {
                Ok(status) => ExitCode::from(status),
                Err(e) => {
                    log::warn!("Failed to wait for {}: {}", tool, e);
                    ExitCode::UNKNOWN
                }
            };
            let _ = event_tx.send(ProcessEvent::Exited(code));
        });

        Ok(RunningProcess::new(
            invocation.tool,
            pid,
            event_rx,
            Box::new(input_tx),
            kill_tx,
        ))
    }
}

/// Forwards raw chunks from one pipe, never splitting a UTF-8 sequence.
async fn forward_output<R>(mut reader: R, stream: StreamKind, tx: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let text = take_utf8(&mut pending);
                if !text.is_empty() && tx.send(ProcessEvent::Output { stream, text }).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::warn!("Failed to read {:?}: {}", stream, e);
                break;
            }
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        let _ = tx.send(ProcessEvent::Output { stream, text });
    }
}

/// Takes the longest valid UTF-8 prefix of `pending`, leaving an incomplete
/// trailing sequence in place. Invalid bytes are replaced.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let rest = pending.split_off(valid);
            let text = String::from_utf8_lossy(pending).into_owned();
            *pending = rest;
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
