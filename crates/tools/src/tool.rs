use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An external executable, located once and invoked many times.
///
/// Not finding the binary is **not** an error at construction time: the
/// capability built on top of it simply fails per file with
/// [`ErrorKind::ToolNotFound`] when it's actually needed.
#[derive(Clone, Debug)]
pub struct Tool {
    name: &'static str,
    path: Option<PathBuf>,
}

/// Captured (lossily decoded) output of a successful invocation.
#[derive(Debug)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

impl Tool {
    pub(crate) fn new(name: &'static str, path: Option<PathBuf>) -> Self {
        Self { name, path }
    }

    /// Locates `name`, preferring an explicitly `configured` path and falling
    /// back to searching `PATH` for each of the `candidates` in order.
    pub fn discover(name: &'static str, configured: Option<&Path>, candidates: &[&str]) -> Self {
        if let Some(path) = configured {
            if path.is_file() {
                return Self::new(name, Some(path.to_path_buf()));
            }
            tracing::warn!(tool = name, path = %path.display(), "Configured tool path is not a file; searching PATH instead");
        }
        for exe in candidates {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(tool = name, path = %path.display(), "Discovered tool on PATH");
                return Self::new(name, Some(path));
            }
        }
        tracing::info!(tool = name, "Tool not found; dependent operations will fail per file");
        Self::new(name, None)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }

    /// Runs the tool to completion, killing it if `timeout` elapses first.
    ///
    /// Non-zero exit statuses become [`ErrorKind::ToolFailed`] carrying the
    /// captured output, so the diagnostics log gets to see what the tool said.
    pub fn run<I, S>(&self, args: I, timeout: Duration) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let Some(path) = &self.path else {
            exn::bail!(ErrorKind::ToolNotFound(self.name));
        };
        let mut command = Command::new(path);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        tracing::trace!(tool = self.name, command = ?command, "Spawning external tool");
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => exn::bail!(ErrorKind::ToolNotFound(self.name)),
            Err(_) => exn::bail!(ErrorKind::Spawn(self.name)),
        };
        // Both pipes are drained on their own threads; a chatty tool (looking
        // at you, ffmpeg) would otherwise fill the pipe buffer and never exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        // On timeout the drain threads are detached; grandchildren may still
        // hold the pipes open.
        let status = self.wait(&mut child, timeout)?;
        let stdout = collect(stdout);
        let stderr = collect(stderr);
        if !status.success() {
            exn::bail!(ErrorKind::ToolFailed { tool: self.name, code: status.code(), stdout, stderr });
        }
        Ok(Output { stdout, stderr })
    }

    fn wait(&self, child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if start.elapsed() >= timeout => {
                    _ = child.kill();
                    _ = child.wait();
                    tracing::warn!(tool = self.name, timeout_secs = timeout.as_secs(), "External tool timed out; killed");
                    exn::bail!(ErrorKind::Timeout { tool: self.name, timeout });
                },
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(_) => {
                    _ = child.kill();
                    exn::bail!(ErrorKind::Spawn(self.name));
                },
            }
        }
    }
}

trait Pipe: Read + Send + 'static {}
impl Pipe for ChildStdout {}
impl Pipe for ChildStderr {}

fn drain<P: Pipe>(pipe: Option<P>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell() -> Tool {
        Tool::discover("sh", None, &["sh"])
    }

    #[test]
    fn test_missing_tool() {
        let tool = Tool::new("definitely-not-installed", None);
        assert!(!tool.is_available());
        let err = tool.run(["--version"], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolNotFound("definitely-not-installed")));
    }

    #[test]
    fn test_discover_falls_back_from_bad_configured_path() {
        let tool = Tool::discover("sh", Some(Path::new("/nonexistent/sh")), &["sh"]);
        assert!(tool.is_available());
        assert_ne!(tool.path(), Some(Path::new("/nonexistent/sh")));
    }

    #[test]
    fn test_captures_output() {
        let output = shell().run(["-c", "echo hello; echo oops >&2"], Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn test_non_zero_exit() {
        let err = shell().run(["-c", "echo broken >&2; exit 3"], Duration::from_secs(5)).unwrap_err();
        match &*err {
            ErrorKind::ToolFailed { tool, code, stderr, .. } => {
                assert_eq!(*tool, "sh");
                assert_eq!(*code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let start = Instant::now();
        let err = shell().run(["-c", "exec sleep 5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Timeout { tool: "sh", .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_large_output_does_not_block() {
        // Well beyond a typical 64KiB pipe buffer.
        let output = shell().run(["-c", "head -c 400000 /dev/zero | tr '\\0' 'x' >&2"], Duration::from_secs(10)).unwrap();
        assert_eq!(output.stderr.len(), 400_000);
    }
}
