//! Interpreter spawning, command execution and teardown.

use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

use super::io::{CommandWriter, Drained, MarkedReader, Sentinel};
use crate::config::InterpreterConfig;
use crate::output::ExecOutput;
use crate::{Error, Result};

/// Lifecycle state of a [`ManagedInterpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterState {
    /// Created, no process yet.
    Unstarted,
    /// The child process is running and accepting commands.
    Running,
    /// Stopped for good; create a new interpreter to run more commands.
    Stopped,
}

/// A long-lived interpreter process that runs one command at a time.
///
/// Commands are written to the interpreter's stdin, each followed by an echo
/// of a random completion marker. Output is read from stdout and stderr up to
/// that marker.
///
/// # Thread Safety
///
/// `ManagedInterpreter` is `Send + Sync` and can be shared across tasks.
/// Concurrent calls to [`execute`](Self::execute) are serialized internally.
/// [`stop`](Self::stop) may be called while a command is in flight; that
/// command then fails with [`Error::Interrupted`].
///
/// # Cancellation
///
/// Dropping a running `ManagedInterpreter` kills the subprocess.
///
/// # Example
///
/// ```ignore
/// let shell = ManagedInterpreter::new("/bin/bash")?;
/// shell.start()?;
/// let output = shell.execute("echo hello").await?;
/// assert_eq!(output.stdout, "hello");
/// shell.stop().await?;
/// ```
#[derive(Debug)]
pub struct ManagedInterpreter {
    config: InterpreterConfig,
    state: Mutex<Lifecycle>,
}

#[derive(Debug)]
enum Lifecycle {
    Unstarted,
    Running(RunningProcess),
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> InterpreterState {
        match self {
            Lifecycle::Unstarted => InterpreterState::Unstarted,
            Lifecycle::Running(_) => InterpreterState::Running,
            Lifecycle::Stopped => InterpreterState::Stopped,
        }
    }
}

/// Everything owned while the interpreter runs.
#[derive(Debug)]
struct RunningProcess {
    child: Child,
    pipes: Arc<tokio::sync::Mutex<Pipes>>,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct Pipes {
    stdin: CommandWriter,
    stdout: MarkedReader<ChildStdout>,
    stderr: MarkedReader<ChildStderr>,
    awaiting: Awaiting,
}

/// Markers written to the interpreter but not yet read back.
///
/// Non-empty between calls only when an `execute` was dropped before its
/// output was framed.
#[derive(Debug, Default)]
struct Awaiting {
    stdout: Option<String>,
    stderr: Option<String>,
}

impl Awaiting {
    fn both(marker: String) -> Self {
        Self {
            stdout: Some(marker.clone()),
            stderr: Some(marker),
        }
    }

    fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }
}

impl ManagedInterpreter {
    /// Create an interpreter for the executable at `path`.
    ///
    /// No process is spawned until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `path` is empty.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Ok(Self::with_config(InterpreterConfig::for_program(path)?))
    }

    /// Create an interpreter with the given configuration.
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Lifecycle::Unstarted),
        }
    }

    /// Spawn the interpreter process and wire its pipes.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::StartFailure`] if the process cannot be spawned
    /// - [`Error::AlreadyStarted`] if it is already running
    /// - [`Error::Stopped`] if it was stopped before
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock_state();
        match *state {
            Lifecycle::Unstarted => {}
            Lifecycle::Running(_) => return Err(Error::AlreadyStarted),
            Lifecycle::Stopped => return Err(Error::Stopped),
        }

        let running = spawn_process(&self.config)?;
        tracing::info!(
            program = %self.config.program,
            pid = ?running.child.id(),
            "interpreter started"
        );
        *state = Lifecycle::Running(running);
        Ok(())
    }

    /// Run `command` and collect what it writes to stdout and stderr.
    ///
    /// Stdout is trimmed of surrounding whitespace; stderr is returned as is.
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] before `start` or after `stop`
    /// - [`Error::WriteFailure`] if the command cannot be written
    /// - [`Error::Truncated`] if stdout ends or fails before the command
    ///   completes; the partial output is kept in the error
    /// - [`Error::Interrupted`] if `stop` is called meanwhile
    ///
    /// # Cancellation
    ///
    /// The returned future may be dropped, e.g. under a caller's timeout. The
    /// command keeps running; its output is discarded by the next `execute`,
    /// which waits for it to finish first.
    pub async fn execute(&self, command: &str) -> Result<ExecOutput> {
        let (pipes, cancel) = {
            let state = self.lock_state();
            match &*state {
                Lifecycle::Running(running) => {
                    (Arc::clone(&running.pipes), running.cancel.clone())
                }
                _ => return Err(Error::NotStarted),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Interrupted),
            result = self.exchange(&pipes, command) => result,
        }
    }

    /// Write one command and read its framed output.
    ///
    /// Output still owed by an abandoned call is read and discarded first.
    async fn exchange(
        &self,
        pipes: &tokio::sync::Mutex<Pipes>,
        command: &str,
    ) -> Result<ExecOutput> {
        let mut pipes = pipes.lock().await;
        let Pipes {
            stdin,
            stdout,
            stderr,
            awaiting,
        } = &mut *pipes;
        let grace = self.config.stderr_grace;

        if !awaiting.is_empty() {
            tracing::debug!("discarding output of an abandoned command");
            if let Err(e) = drain_framed(grace, stdout, stderr, awaiting).await {
                tracing::warn!(error = %e, "error reading stdout of abandoned command");
            }
            stdout.take_pending();
            stderr.take_pending();
        }

        let sentinel = Sentinel::new();
        *awaiting = Awaiting::both(sentinel.marker());
        if let Err(e) = stdin.send(&sentinel.script(command)).await {
            *awaiting = Awaiting::default();
            return Err(Error::WriteFailure(e));
        }
        tracing::debug!(command, "command sent");

        let out_result = drain_framed(grace, stdout, stderr, awaiting).await;

        let mut output = ExecOutput::new(
            sentinel.clean(&stdout.take_pending()),
            sentinel.clean(&stderr.take_pending()),
        );
        output.stdout = output.stdout.trim().to_string();

        match out_result {
            Ok(Drained::Marker) => Ok(output),
            Ok(Drained::Eof) => {
                tracing::warn!("stdout closed before command completed");
                Err(Error::Truncated {
                    output,
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "interpreter stdout closed",
                    ),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "error reading stdout");
                Err(Error::Truncated { output, source: e })
            }
        }
    }

    /// Kill the interpreter and reap it.
    ///
    /// Idempotent: stopping an interpreter that is not running succeeds and
    /// leaves it [`Stopped`](InterpreterState::Stopped).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownFailure`] if waiting for the process fails.
    /// The interpreter is stopped either way.
    pub async fn stop(&self) -> Result<()> {
        let running = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                previous => {
                    tracing::debug!(
                        state = ?previous.state(),
                        "interpreter not running, nothing to stop"
                    );
                    return Ok(());
                }
            }
        };
        running.shutdown().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InterpreterState {
        self.lock_state().state()
    }

    /// Process ID of the running interpreter.
    pub fn pid(&self) -> Option<u32> {
        match &*self.lock_state() {
            Lifecycle::Running(running) => running.child.id(),
            _ => None,
        }
    }

    /// Check if the interpreter is running.
    pub fn is_running(&self) -> bool {
        self.state() == InterpreterState::Running
    }

    /// Get a reference to the underlying config.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ManagedInterpreter {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Lifecycle::Running(running) = state {
            running.cancel.cancel();
            running.kill();
        }
    }
}

impl RunningProcess {
    async fn shutdown(mut self) -> Result<()> {
        let pid = self.child.id();
        self.cancel.cancel();

        match self.pipes.try_lock() {
            Ok(mut pipes) if pipes.stdin.is_open() => {
                if let Err(e) = pipes.stdin.close().await {
                    tracing::warn!(?pid, error = %e, "failed to close interpreter stdin");
                }
            }
            Ok(_) => {
                tracing::debug!(?pid, "interpreter stdin already closed");
            }
            Err(_) => {
                tracing::debug!(?pid, "command in flight, stdin closes when it returns");
            }
        }

        self.kill();

        let status = self.child.wait().await.map_err(Error::ShutdownFailure)?;
        tracing::info!(?pid, %status, "interpreter stopped");
        Ok(())
    }

    /// Send SIGKILL to the interpreter and everything it started.
    fn kill(&mut self) {
        if let Some(pid) = self.child.id() {
            kill_process_group(pid);
        }

        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "failed to kill interpreter");
        }
    }
}

/// Read both streams until the markers in `awaiting` show up.
///
/// Stderr is read alongside stdout so a chatty stderr cannot fill its pipe
/// and block the command; once stdout is done it gets `grace` more. Each
/// marker is cleared from `awaiting` as soon as its stream is settled, so a
/// dropped call leaves exactly what is still owed. Returns how stdout ended.
async fn drain_framed(
    grace: Duration,
    stdout: &mut MarkedReader<ChildStdout>,
    stderr: &mut MarkedReader<ChildStderr>,
    awaiting: &mut Awaiting,
) -> io::Result<Drained> {
    let out_marker = awaiting.stdout.clone();
    let err_marker = awaiting.stderr.clone();

    let out_drain = async {
        match &out_marker {
            Some(marker) => stdout.drain_until(marker.as_bytes()).await,
            None => Ok(Drained::Marker),
        }
    };
    let err_drain = async {
        match &err_marker {
            Some(marker) => stderr.drain_until(marker.as_bytes()).await,
            None => Ok(Drained::Marker),
        }
    };
    tokio::pin!(out_drain, err_drain);

    let mut err_settled = false;
    let out_result = loop {
        tokio::select! {
            result = &mut out_drain => break result,
            result = &mut err_drain, if !err_settled => {
                err_settled = true;
                awaiting.stderr = None;
                log_stderr_end(result);
            }
        }
    };
    awaiting.stdout = None;

    if !err_settled {
        match tokio::time::timeout(grace, &mut err_drain).await {
            Ok(result) => log_stderr_end(result),
            Err(_) => tracing::warn!(?grace, "stderr marker not seen within grace period"),
        }
        awaiting.stderr = None;
    }
    out_result
}

fn log_stderr_end(result: io::Result<Drained>) {
    match result {
        Ok(Drained::Marker) => {}
        Ok(Drained::Eof) => tracing::debug!("stderr closed"),
        Err(e) => tracing::warn!(error = %e, "error reading stderr"),
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Spawn the child with all three pipes attached.
fn spawn_process(config: &InterpreterConfig) -> Result<RunningProcess> {
    let mut cmd = build_command(config);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let start_failure = |source| Error::StartFailure {
        program: config.program.clone(),
        source,
    };

    let mut child = cmd.spawn().map_err(start_failure)?;

    // The child is killed on drop if any pipe is missing.
    let (Some(stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        return Err(start_failure(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "interpreter pipes unavailable",
        )));
    };

    Ok(RunningProcess {
        child,
        pipes: Arc::new(tokio::sync::Mutex::new(Pipes {
            stdin: CommandWriter::new(stdin),
            stdout: MarkedReader::new(stdout),
            stderr: MarkedReader::new(stderr),
            awaiting: Awaiting::default(),
        })),
        cancel: CancellationToken::new(),
    })
}

/// Build a tokio Command from the config.
fn build_command(config: &InterpreterConfig) -> Command {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args);
    cmd.kill_on_drop(true);

    // Own process group, so stop reaches commands the interpreter forked.
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    if let Some(ref dir) = config.working_directory {
        cmd.current_dir(dir);
    }

    if !config.inherit_env {
        cmd.env_clear();
    }

    for (key, value) in &config.env_vars {
        cmd.env(key, value);
    }

    cmd
}
