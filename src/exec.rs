//! External program execution with stdin input and a bounded wait.
use std::ffi::OsStr;
use std::io::Write as _;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::error::ExecError;

/// Interval between `try_wait` polls while a child is running.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Whether the program exited with status 0.
    pub success: bool,
    /// Exit code, or `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Non-empty lines of standard error.
    #[must_use]
    pub fn stderr_lines(&self) -> Vec<String> {
        self.stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(String::from)
            .collect()
    }
}

/// Abstraction over process execution so pipeline steps and the diff
/// renderer can be tested without spawning real programs.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args`, writing `stdin` to its standard input.
    ///
    /// A non-zero exit is **not** an error here: the returned
    /// [`ExecResult`] reports it and the caller decides what it means.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Launch`] if the program cannot be started,
    /// [`ExecError::Timeout`] if it or anything it started outlives
    /// `timeout` (they are killed), or [`ExecError::Io`] if its pipes fail.
    fn run_with_input(
        &self,
        program: &Path,
        args: &[&OsStr],
        stdin: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, ExecError>;
}

/// Production [`Executor`] that spawns real processes.
///
/// On Unix each child leads its own process group, so a timeout also kills
/// background processes that still hold its output pipes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_with_input(
        &self,
        program: &Path,
        args: &[&OsStr],
        stdin: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, ExecError> {
        let label = program.display().to_string();
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut child = spawn(program, args, &label)?;

        // Feed stdin and drain stdout/stderr on helper threads so a chatty
        // child can never deadlock against a full pipe.
        let input = stdin.to_vec();
        let mut child_stdin = child.stdin.take();
        let writer = background(move || {
            if let Some(pipe) = child_stdin.as_mut() {
                match pipe.write_all(&input) {
                    // The child may legitimately exit without reading stdin.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok(())
        });
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let timed_out = |child: &mut Child| {
            kill_tree(child);
            ExecError::Timeout {
                program: label.clone(),
                timeout: timeout.unwrap_or_default(),
            }
        };
        let io_err = |source| ExecError::Io {
            program: label.clone(),
            source,
        };

        let Some(status) = wait_until(&mut child, deadline).map_err(io_err)? else {
            return Err(timed_out(&mut child));
        };
        // A background descendant can keep the pipes open after the child
        // itself has exited; the deadline covers that wait too.
        let Some(stdout) = collect(&stdout_reader, deadline) else {
            return Err(timed_out(&mut child));
        };
        let Some(stderr) = collect(&stderr_reader, deadline) else {
            return Err(timed_out(&mut child));
        };
        let Some(written) = collect(&writer, deadline) else {
            return Err(timed_out(&mut child));
        };
        let stdout = stdout.map_err(io_err)?;
        let stderr = stderr.map_err(io_err)?;
        written.map_err(io_err)?;

        Ok(ExecResult {
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            success: status.success(),
            code: status.code(),
        })
    }
}

/// Spawn `program` with all three standard streams piped.
///
/// Retries briefly on `ETXTBSY`, which Linux reports when another thread
/// forked while the script file was still open for writing.
fn spawn(program: &Path, args: &[&OsStr], label: &str) -> Result<Child, ExecError> {
    const ETXTBSY: i32 = 26;
    let mut attempts = 0;
    loop {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            command.process_group(0);
        }
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(e) if cfg!(target_os = "linux") && e.raw_os_error() == Some(ETXTBSY) && attempts < 5 => {
                attempts += 1;
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                return Err(ExecError::Launch {
                    program: label.to_string(),
                    source,
                });
            }
        }
    }
}

type Pending<T> = Receiver<std::io::Result<T>>;

/// Run `work` on a helper thread and hand back a receiver for its result.
fn background<T, F>(work: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(work());
    });
    rx
}

fn drain<R: std::io::Read + Send + 'static>(pipe: Option<R>) -> Pending<Vec<u8>> {
    background(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

/// Wait for a helper thread's result; `None` once `deadline` has passed.
fn collect<T>(pending: &Pending<T>, deadline: Option<Instant>) -> Option<std::io::Result<T>> {
    let received = match deadline {
        None => pending.recv().map_err(|_| RecvTimeoutError::Disconnected),
        Some(deadline) => pending.recv_timeout(deadline.saturating_duration_since(Instant::now())),
    };
    match received {
        Ok(result) => Some(result),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Err(std::io::Error::other("helper thread panicked"))),
    }
}

/// Poll the child until it exits; `None` once `deadline` has passed.
fn wait_until(
    child: &mut Child,
    deadline: Option<Instant>,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and, on Unix, every process in its group, then reap it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Check if a program is available on PATH.
#[must_use]
pub fn which(program: &str) -> bool {
    which::which(program).is_ok()
}
