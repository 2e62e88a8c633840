use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A program and its arguments, run without a shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ExternalCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Trimmed, non-empty output lines of a command. Empty when the command failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLines(Vec<String>);

impl CommandLines {
    pub fn from_output(output: &str) -> Self {
        Self(
            output
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for CommandLines {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug)]
enum CommandError {
    Spawn(io::Error),
    Exit(ExitStatus),
    TimedOut(Duration),
    Read,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Spawn(err) => write!(f, "failed to spawn: {err}"),
            CommandError::Exit(status) => write!(f, "exited with {status}"),
            CommandError::TimedOut(limit) => write!(f, "timed out after {limit:?}"),
            CommandError::Read => write!(f, "failed to read stdout"),
        }
    }
}

/// Run `command` in `cwd` and split its stdout into lines.
///
/// Any failure (missing binary, non-zero exit, timeout) yields no lines; the
/// cause is only logged at debug level.
pub fn run_and_split_lines(command: &ExternalCommand, cwd: &Path) -> CommandLines {
    match run(command, cwd) {
        Ok(stdout) => CommandLines::from_output(&stdout),
        Err(err) => {
            debug!("`{command}` in {}: {err}", cwd.display());
            CommandLines::default()
        }
    }
}

fn run(command: &ExternalCommand, cwd: &Path) -> Result<String, CommandError> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(CommandError::Spawn)?;

    let Some(mut stdout) = child.stdout.take() else {
        reap(&mut child);
        return Err(CommandError::Read);
    };

    // Drain stdout on a helper thread so a chatty child cannot block on a full pipe.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = tx.send(stdout.read_to_end(&mut buf).map(|_| buf));
    });

    let deadline = Instant::now() + command.timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                reap(&mut child);
                drop(child);
                // The reader is never joined; a grandchild may hold stdout open.
                return Err(CommandError::TimedOut(command.timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                reap(&mut child);
                return Err(CommandError::Spawn(err));
            }
        }
    };

    // A background grandchild can keep the pipe open after the child exits,
    // so the read is bounded by the same deadline.
    let remaining = deadline.saturating_duration_since(Instant::now());
    let bytes = match rx.recv_timeout(remaining) {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(_)) | Err(mpsc::RecvTimeoutError::Disconnected) => return Err(CommandError::Read),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            return Err(CommandError::TimedOut(command.timeout));
        }
    };

    if !status.success() {
        return Err(CommandError::Exit(status));
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
