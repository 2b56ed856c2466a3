//! Backend process management
//!
//! Spawns the calculator backend once, forwards its output to a log sink and
//! terminates it once on shutdown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;

use crate::config::BackendConfig;
use crate::{Error, Result};

/// Which of the child's output streams a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives the backend's output, one line at a time
pub trait OutputSink: Send + Sync + 'static {
    fn line(&self, stream: OutputStream, line: &str);

    /// Called once when a stream reaches EOF
    fn closed(&self, _stream: OutputStream) {}
}

/// Default sink: stdout at INFO, stderr at WARN, under the `backend` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => tracing::info!(target: "backend", "{}", line),
            OutputStream::Stderr => tracing::warn!(target: "backend", "{}", line),
        }
    }

    fn closed(&self, stream: OutputStream) {
        tracing::debug!(target: "backend", "{:?} closed", stream);
    }
}

/// Lifecycle of the backend child. Transitions only move forward.
enum BackendState {
    NotStarted,
    Running(Child),
    Failed,
    Terminated,
}

/// Owns the backend child process
pub struct BackendSupervisor {
    config: BackendConfig,
    sink: Arc<dyn OutputSink>,
    state: Mutex<BackendState>,
}

impl BackendSupervisor {
    pub fn new(config: BackendConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            config,
            sink,
            state: Mutex::new(BackendState::NotStarted),
        }
    }

    /// Spawn the backend process.
    ///
    /// Returns `Ok(true)` when a process was started and `Ok(false)` when one was
    /// already started (or failed to start) earlier in this run. Must be called
    /// from within a tokio runtime.
    pub fn spawn(&self) -> Result<bool> {
        let mut state = self.state.lock();
        if !matches!(*state, BackendState::NotStarted) {
            tracing::warn!("Backend spawn requested more than once, ignoring");
            return Ok(false);
        }

        let program = resolve_program(&self.config.program);
        tracing::info!("Spawning backend: {:?} {:?}", program, self.config.args);

        let mut command = tokio::process::Command::new(&program);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                *state = BackendState::Failed;
                return Err(Error::Backend(format!(
                    "Failed to spawn {:?}: {}",
                    program, e
                )));
            }
        };

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, OutputStream::Stdout, self.sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, OutputStream::Stderr, self.sink.clone());
        }

        tracing::info!("Backend started with pid {:?}", child.id());
        *state = BackendState::Running(child);
        Ok(true)
    }

    /// Kill the backend if it is running.
    ///
    /// Best effort: failures are logged. Returns `true` only for the call that
    /// actually moved a running process to terminated.
    pub fn terminate(&self) -> bool {
        let mut state = self.state.lock();
        let mut child = match std::mem::replace(&mut *state, BackendState::Terminated) {
            BackendState::Running(child) => child,
            other => {
                *state = other;
                return false;
            }
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("Backend already exited with status: {}", status);
            }
            _ => match child.start_kill() {
                Ok(()) => tracing::info!("Backend terminated"),
                Err(e) => tracing::warn!("Failed to kill backend: {}", e),
            },
        }

        true
    }

    /// Check if the backend process is still alive
    pub fn is_running(&self) -> bool {
        match &mut *self.state.lock() {
            BackendState::Running(child) => matches!(child.try_wait(), Ok(None)),
            _ => false,
        }
    }

    /// OS process id of the running backend
    pub fn pid(&self) -> Option<u32> {
        match &*self.state.lock() {
            BackendState::Running(child) => child.id(),
            _ => None,
        }
    }
}

/// Find the program on PATH, or hand it to the OS unchanged
fn resolve_program(program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.to_path_buf();
    }

    match which::which(program) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::debug!("Could not resolve {} on PATH: {}", program, e);
            path.to_path_buf()
        }
    }
}

/// Forward a stream line by line. Bytes that are not UTF-8 are replaced, never
/// fatal: the reader must keep draining the pipe or the backend's writes fail.
fn forward_lines<R>(reader: R, stream: OutputStream, sink: Arc<dyn OutputSink>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => sink.line(stream, &decode_line(&buf)),
                Err(e) => {
                    tracing::warn!("Error reading backend {:?}: {}", stream, e);
                    break;
                }
            }
        }
        sink.closed(stream);
    });
}

fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
