//! Child-process helper with a timeout and bounded output capture.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes discarded beyond the capture limit (stdout + stderr).
    pub truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `cmd`, feed it `input` on stdin, and wait at most `timeout`.
///
/// stdout and stderr are drained on reader threads so a chatty child cannot
/// block on a full pipe; at most `output_limit_bytes` of each is kept. A child
/// that outlives `timeout` is killed and reported with `timed_out = true`.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes = output_limit_bytes))]
pub fn run_with_input(
    mut cmd: Command,
    input: &[u8],
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_reader = thread::spawn(move || read_limited(stdout, output_limit_bytes));
    let stderr_reader = thread::spawn(move || read_limited(stderr, output_limit_bytes));

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    let payload = input.to_vec();
    // Written off-thread so a child that never reads stdin still hits the timeout.
    let stdin_writer = thread::spawn(move || {
        if let Err(err) = stdin.write_all(&payload) {
            warn!(err = %err, "child closed stdin early");
        }
    });

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            (child.wait().context("wait command after kill")?, true)
        }
    };

    if stdin_writer.join().is_err() {
        warn!("stdin writer thread panicked");
    }
    let (stdout, stdout_dropped) = join_reader(stdout_reader).context("join stdout")?;
    let (stderr, stderr_dropped) = join_reader(stderr_reader).context("join stderr")?;
    let truncated = stdout_dropped + stderr_dropped;
    if truncated > 0 {
        warn!(truncated, "command output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        truncated,
        timed_out,
    })
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}

/// Read `reader` to the end, keeping at most `limit` bytes.
///
/// Returns the kept bytes and the count of discarded ones.
fn read_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        let keep = n.min(room);
        kept.extend_from_slice(&chunk[..keep]);
        dropped += n - keep;
    }

    Ok((kept, dropped))
}
