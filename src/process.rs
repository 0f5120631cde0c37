#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    time::timeout,
};

/// One line of process output, tagged with the pipe it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    /// A line written to stdout.
    Stdout(String),
    /// A line written to stderr.
    Stderr(String),
}

/// Output of a finished build process.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Output lines from both pipes, in the order they were read.
    pub lines:  Vec<OutputLine>,
}

/// Decodes one raw line lossily, dropping a trailing CR.
fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reads both pipes line by line until both are closed, keeping arrival
/// order across them.
async fn interleave(
    stdout: impl AsyncRead + Unpin,
    stderr: impl AsyncRead + Unpin,
) -> Result<Vec<OutputLine>> {
    let mut stdout = BufReader::new(stdout).split(b'\n');
    let mut stderr = BufReader::new(stderr).split(b'\n');
    let (mut stdout_open, mut stderr_open) = (true, true);
    let mut lines = Vec::new();

    while stdout_open || stderr_open {
        tokio::select! {
            segment = stdout.next_segment(), if stdout_open => {
                match segment.context("failed to read stdout")? {
                    Some(bytes) => lines.push(OutputLine::Stdout(decode_line(bytes))),
                    None => stdout_open = false,
                }
            }
            segment = stderr.next_segment(), if stderr_open => {
                match segment.context("failed to read stderr")? {
                    Some(bytes) => lines.push(OutputLine::Stderr(decode_line(bytes))),
                    None => stderr_open = false,
                }
            }
        }
    }

    Ok(lines)
}

/// Spawns `program` with stdin closed and collects its output until it
/// exits. The child is killed if `deadline` passes first.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: Option<&Path>,
    env: &[(OsString, OsString)],
    deadline: Option<Duration>,
) -> Result<Collected> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::debug!("Spawning {} {:?}", program.to_string_lossy(), args);
    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {}", program.to_string_lossy()))?;

    let stdout = child.stdout.take().context("missing stdout pipe")?;
    let stderr = child.stderr.take().context("missing stderr pipe")?;

    let wait = async move {
        let (lines, status) = tokio::try_join!(interleave(stdout, stderr), async {
            child.wait().await.context("failed to wait on process")
        })?;
        Ok::<Collected, anyhow::Error>(Collected { status, lines })
    };

    match deadline {
        Some(limit) => timeout(limit, wait).await.context("build process timed out")?,
        None => wait.await,
    }
}
