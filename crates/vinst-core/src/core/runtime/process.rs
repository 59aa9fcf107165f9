use std::{
    collections::VecDeque,
    io::Read,
    path::Path,
    process::{Command, Stdio},
    thread,
};

use anyhow::{anyhow, Context, Result};

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;
const FAILURE_TAIL_LINES: usize = 20;

fn max_capture_bytes() -> usize {
    std::env::var("VINST_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Exit code plus the last lines of output, for error messages.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let lines: Vec<&str> = source
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
        let tail = lines[start..].join("\n");
        if tail.is_empty() {
            format!("exit code {}", self.code)
        } else {
            format!("exit code {}:\n{tail}", self.code)
        }
    }
}

/// Execute a program and capture stdout/stderr.
///
/// `envs` is applied to the child only; the current process environment is
/// never modified.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or the I/O streams cannot
/// be read entirely.
pub fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
) -> Result<RunOutput> {
    let mut command = configured_command(program, args, envs, cwd);

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let limit = max_capture_bytes();
    let stdout = child.stdout.take().map(|pipe| drain(pipe, limit));
    let stderr = child.stderr.take().map(|pipe| drain(pipe, limit));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        stdout: collect(stdout, program, "stdout")?,
        stderr: collect(stderr, program, "stderr")?,
    })
}

fn configured_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
) -> Command {
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs.iter().map(|(key, value)| (key, value)))
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

type Drain = thread::JoinHandle<std::io::Result<TailBuffer>>;

fn drain(mut pipe: impl Read + Send + 'static, limit: usize) -> Drain {
    thread::spawn(move || {
        let mut tail = TailBuffer::new(limit);
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk)? {
                0 => return Ok(tail),
                read => tail.push(&chunk[..read]),
            }
        }
    })
}

fn collect(handle: Option<Drain>, program: &str, stream: &str) -> Result<String> {
    let handle = handle.ok_or_else(|| anyhow!("{stream} missing for {program}"))?;
    let tail = handle
        .join()
        .map_err(|_| anyhow!("{stream} reader for {program} panicked"))?
        .with_context(|| format!("reading {stream} of {program}"))?;
    Ok(tail.into_string())
}

/// Keeps the newest `limit` bytes of a stream; pip prints the interesting
/// part last.
struct TailBuffer {
    bytes: VecDeque<u8>,
    limit: usize,
    truncated: bool,
}

impl TailBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: VecDeque::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend(chunk);
        let excess = self.bytes.len().saturating_sub(self.limit);
        if excess > 0 {
            self.truncated = true;
            self.bytes.drain(..excess);
        }
    }

    fn into_string(self) -> String {
        let (head, tail) = self.bytes.as_slices();
        let mut text = String::from_utf8_lossy(&[head, tail].concat()).into_owned();
        if self.truncated {
            text.insert_str(0, "[...truncated...]\n");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::Path;

    #[cfg(unix)]
    #[test]
    #[serial]
    fn run_command_captures_output_and_status_unix() -> Result<()> {
        let output = run_command(
            "/bin/sh",
            &[
                "-c".to_string(),
                "printf out && printf err >&2; exit 7".to_string(),
            ],
            &[],
            Path::new("."),
        )?;
        assert_eq!(output.code, 7);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
        assert!(!output.success());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn run_command_scopes_env_to_child_unix() -> Result<()> {
        let output = run_command(
            "/bin/sh",
            &[
                "-c".to_string(),
                "printf %s \"$CARGO_NET_GIT_FETCH_WITH_CLI\"".to_string(),
            ],
            &[("CARGO_NET_GIT_FETCH_WITH_CLI".into(), "true".into())],
            Path::new("."),
        )?;
        assert_eq!(output.stdout, "true");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn capture_limit_keeps_output_tail_unix() -> Result<()> {
        std::env::set_var("VINST_MAX_CAPTURE_BYTES", "4");
        let output = run_command(
            "/bin/sh",
            &["-c".to_string(), "printf abcdefgh".to_string()],
            &[],
            Path::new("."),
        );
        std::env::remove_var("VINST_MAX_CAPTURE_BYTES");
        assert_eq!(output?.stdout, "[...truncated...]\nefgh");
        Ok(())
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = run_command(
            "vinst-definitely-not-a-real-program",
            &[],
            &[],
            Path::new("."),
        )
        .expect_err("spawn should fail");
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn tail_buffer_keeps_newest_bytes() {
        let mut tail = TailBuffer::new(4);
        tail.push(b"ab");
        assert!(!tail.truncated);
        tail.push(b"cdef");
        tail.push(b"gh");
        assert!(tail.truncated);
        assert_eq!(tail.into_string(), "[...truncated...]\nefgh");

        let mut short = TailBuffer::new(16);
        short.push(b"ok");
        assert_eq!(short.into_string(), "ok");
    }

    #[test]
    fn failure_summary_prefers_stderr_tail() {
        let output = RunOutput {
            code: 1,
            stdout: "collecting\n".into(),
            stderr: (0..30).map(|i| format!("line {i}\n")).collect(),
        };
        let summary = output.failure_summary();
        assert!(summary.starts_with("exit code 1:"));
        assert!(summary.contains("line 29"));
        assert!(!summary.contains("line 9\n"));
        assert!(!summary.contains("collecting"));

        let quiet = RunOutput {
            code: 3,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(quiet.failure_summary(), "exit code 3");
    }
}
