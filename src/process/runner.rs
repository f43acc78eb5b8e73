//! Child process with a streamed, cancellable line output

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::ExternalTool;
use super::lines::LineSplitter;
use crate::core::CancelToken;
use crate::error::{Error, Result};

/// How often blocked reads and waits re-check for termination
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a terminated child gets to exit before it is killed outright
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Launch a tool and start streaming its combined output
///
/// A tool that fails to start is reported as [`Error::ToolStart`] before
/// any output is produced. A tool that starts and later fails shows up as a
/// non-success status from [`RunningProcess::wait`].
pub fn spawn<I, S>(tool: &ExternalTool, args: I) -> Result<RunningProcess>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(tool.program());
    cmd.args(tool.base_args())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Keep Ctrl+C from the terminal away from the child; cancellation
    // reaches it through the terminator instead
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    log::debug!("Running {:?}", cmd);

    let mut child = cmd.spawn().map_err(|source| Error::ToolStart {
        tool: tool.name().to_string(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let readers = [
        child.stdout.take().map(|out| spawn_reader(tool.name(), "stdout", out, tx.clone())),
        child.stderr.take().map(|err| spawn_reader(tool.name(), "stderr", err, tx)),
    ];
    for reader in readers.into_iter().flatten() {
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Io(e));
        }
    }

    let terminator = Terminator::new(child.id());
    Ok(RunningProcess {
        tool: tool.name().to_string(),
        child,
        lines: rx,
        terminator,
        cancel: None,
        termination_seen: None,
        status: None,
        closed: false,
    })
}

/// Drain one pipe on its own thread, forwarding complete lines
///
/// The handle is dropped: a reader can stay blocked after the child is gone
/// if a grandchild still holds the pipe, and nobody should wait on that.
fn spawn_reader<R>(
    tool: &str,
    stream: &str,
    mut reader: R,
    tx: Sender<String>,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-{}", tool, stream))
        .spawn(move || {
            let mut splitter = LineSplitter::new();
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        for line in splitter.push(&buf[..n]) {
                            if tx.send(line).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::debug!("Pipe read failed: {}", e);
                        break;
                    }
                }
            }
            if let Some(line) = splitter.finish() {
                let _ = tx.send(line);
            }
        })
}

/// Cloneable handle that asks a running child to stop
///
/// Safe to call from any thread, any number of times. The `exited` lock is
/// held while the child is reaped, so a signal never reaches a recycled pid.
#[derive(Debug, Clone)]
pub struct Terminator {
    pid: u32,
    requested: Arc<AtomicBool>,
    exited: Arc<Mutex<bool>>,
}

impl Terminator {
    fn new(pid: u32) -> Self {
        Self {
            pid,
            requested: Arc::new(AtomicBool::new(false)),
            exited: Arc::new(Mutex::new(false)),
        }
    }

    /// Request the child stop as soon as possible
    ///
    /// On unix this sends SIGTERM so the tool can shut down cleanly. The
    /// owning [`RunningProcess`] escalates to a kill if the child lingers.
    pub fn terminate(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let exited = self.lock_exited();
        if *exited {
            return;
        }

        #[cfg(unix)]
        unsafe {
            libc::kill(self.pid as i32, libc::SIGTERM);
        }
        drop(exited);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Whether the child has been reaped
    pub fn has_exited(&self) -> bool {
        *self.lock_exited()
    }

    fn lock_exited(&self) -> MutexGuard<'_, bool> {
        self.exited.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A launched tool whose output is read line by line
///
/// Iterating yields each non-empty output line until the child closes its
/// pipes. Iteration ends early, abandoning pending output, as soon as
/// termination is requested or the watched cancel token is set.
#[derive(Debug)]
pub struct RunningProcess {
    tool: String,
    child: Child,
    lines: Receiver<String>,
    terminator: Terminator,
    cancel: Option<CancelToken>,
    termination_seen: Option<Instant>,
    status: Option<ExitStatus>,
    closed: bool,
}

enum LineEvent {
    Line(String),
    Closed,
    TimedOut,
}

impl RunningProcess {
    /// Terminate the child when `token` is cancelled
    pub fn watch(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator.clone()
    }

    pub fn terminate(&mut self) {
        self.terminator.terminate();
        self.observe_termination();
    }

    /// Whether termination was requested, directly or through the cancel token
    pub fn was_terminated(&self) -> bool {
        self.terminator.is_requested()
    }

    /// Read the next line, blocking until one arrives or the stream ends
    pub fn next_line(&mut self) -> Option<String> {
        match self.next_event(None) {
            LineEvent::Line(line) => Some(line),
            LineEvent::Closed | LineEvent::TimedOut => None,
        }
    }

    /// Wait for the child to exit
    ///
    /// After a termination request the child gets a grace period and is then
    /// killed. The status is cached, so calling this twice is fine.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        let status = loop {
            {
                let mut exited = self.terminator.lock_exited();
                if let Some(status) = self.child.try_wait()? {
                    *exited = true;
                    break status;
                }
            }

            self.observe_cancel();
            self.observe_termination();
            if let Some(since) = self.termination_seen
                && since.elapsed() >= TERMINATE_GRACE
            {
                log::warn!("{} ignored termination, killing it", self.tool);
                let mut exited = self.terminator.lock_exited();
                let _ = self.child.kill();
                let status = self.child.wait()?;
                *exited = true;
                break status;
            }

            thread::sleep(POLL_INTERVAL);
        };

        self.status = Some(status);
        log::debug!("{} exited with {}", self.tool, status);
        Ok(status)
    }

    /// Read all output and the exit status, giving up after `timeout`
    ///
    /// On timeout the child is terminated and [`Error::Timeout`] returned.
    pub fn collect_output(mut self, timeout: Duration) -> Result<(Vec<String>, ExitStatus)> {
        let deadline = Instant::now() + timeout;
        let mut output = Vec::new();

        loop {
            match self.next_event(Some(deadline)) {
                LineEvent::Line(line) => output.push(line),
                LineEvent::Closed => break,
                LineEvent::TimedOut => {
                    self.terminate();
                    let _ = self.wait();
                    return Err(Error::Timeout {
                        tool: self.tool.clone(),
                        timeout,
                    });
                }
            }
        }

        let status = self.wait()?;
        Ok((output, status))
    }

    fn next_event(&mut self, deadline: Option<Instant>) -> LineEvent {
        loop {
            if self.closed {
                return LineEvent::Closed;
            }

            self.observe_cancel();
            if self.terminator.is_requested() {
                self.observe_termination();
                self.closed = true;
                return LineEvent::Closed;
            }

            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return LineEvent::TimedOut;
            }

            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => return LineEvent::Line(line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    return LineEvent::Closed;
                }
            }
        }
    }

    fn observe_cancel(&mut self) {
        if let Some(token) = &self.cancel
            && token.is_cancelled()
            && !self.terminator.is_requested()
        {
            log::info!("Cancellation requested, terminating {}", self.tool);
            self.terminate();
        }
    }

    /// Start the grace period once a termination request is noticed
    fn observe_termination(&mut self) {
        if self.termination_seen.is_none() && self.terminator.is_requested() {
            self.termination_seen = Some(Instant::now());

            // Without signals there is no polite way to ask
            #[cfg(not(unix))]
            {
                let _ = self.child.kill();
            }
        }
    }
}

impl Iterator for RunningProcess {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_line()
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        if self.status.is_none() {
            let mut exited = self.terminator.lock_exited();
            let _ = self.child.kill();
            let _ = self.child.wait();
            *exited = true;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::shell_tool;

    fn sh(script: &str) -> RunningProcess {
        spawn(&shell_tool("sh"), ["-c", script]).unwrap()
    }

    #[test]
    fn test_streams_stdout_lines_and_exit_status() {
        let mut process = sh("echo one; echo two; exit 0");
        let lines: Vec<String> = process.by_ref().collect();
        assert_eq!(lines, vec!["one", "two"]);
        assert!(process.wait().unwrap().success());
    }

    #[test]
    fn test_stderr_is_included() {
        let mut process = sh("echo out; echo err 1>&2");
        let mut lines: Vec<String> = process.by_ref().collect();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[test]
    fn test_carriage_returns_split_lines() {
        let mut process = sh("printf 'a\\rb\\r\\nc'");
        let lines: Vec<String> = process.by_ref().collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_non_zero_exit_after_output() {
        let mut process = sh("echo failing; exit 3");
        assert_eq!(process.next_line().as_deref(), Some("failing"));
        assert_eq!(process.next_line(), None);
        assert_eq!(process.wait().unwrap().code(), Some(3));
    }

    #[test]
    fn test_missing_executable_is_start_error() {
        let tool = ExternalTool::new("ghost", "/nonexistent/bin/ghost-tool");
        let result = spawn(&tool, ["--version"]);
        assert!(matches!(result, Err(Error::ToolStart { .. })));
    }

    #[test]
    fn test_terminate_abandons_pending_reads() {
        let mut process = sh("echo started; exec sleep 30");
        assert_eq!(process.next_line().as_deref(), Some("started"));

        let terminator = process.terminator();
        let started = Instant::now();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            terminator.terminate();
        });

        assert_eq!(process.next_line(), None);
        let status = process.wait().unwrap();
        assert!(!status.success());
        assert!(process.was_terminated());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_token_stops_stream() {
        let token = CancelToken::new();
        let mut process = sh("echo started; exec sleep 30").watch(token.clone());
        assert_eq!(process.next_line().as_deref(), Some("started"));

        token.cancel();
        assert_eq!(process.next_line(), None);
        assert!(process.was_terminated());
        assert!(!process.wait().unwrap().success());
    }

    #[test]
    fn test_terminate_after_exit_is_noop() {
        let mut process = sh("exit 0");
        let terminator = process.terminator();
        assert!(!terminator.has_exited());

        assert!(process.wait().unwrap().success());
        assert!(terminator.has_exited());

        terminator.terminate();
        assert!(terminator.is_requested());
        assert!(process.wait().unwrap().success());
    }

    #[test]
    fn test_terminator_sees_exit_on_drop() {
        let process = sh("exec sleep 30");
        let terminator = process.terminator();
        drop(process);
        assert!(terminator.has_exited());
        terminator.terminate();
    }

    #[test]
    fn test_collect_output() {
        let process = sh("echo a; echo b 1>&2; exit 1");
        let (mut lines, status) = process.collect_output(Duration::from_secs(10)).unwrap();
        lines.sort();
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(status.code(), Some(1));
    }

    #[test]
    fn test_collect_output_timeout() {
        let process = sh("exec sleep 30");
        let started = Instant::now();
        let result = process.collect_output(Duration::from_millis(200));
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
