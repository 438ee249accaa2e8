//! Line-oriented event feeds and the connectors that open them.
//!
//! A [`FeedConnector`] knows how to reach one upstream server; calling
//! [`FeedConnector::connect`] yields an [`EventFeed`] that hands out raw lines
//! until the upstream closes. Connection retry is not attempted.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// Failure to open a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` has no stdout pipe")]
    MissingStdout { program: String },

    #[error("failed to open replay file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An open newline-delimited feed.
///
/// When the feed is backed by a child process, the process is owned here and
/// killed when the feed is dropped.
pub struct EventFeed {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    process: Option<Child>,
}

impl EventFeed {
    /// Wraps any buffered reader (file, pipe, in-memory cursor).
    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            process: None,
        }
    }

    fn from_process(reader: impl AsyncBufRead + Send + Unpin + 'static, process: Child) -> Self {
        Self {
            reader: Box::new(reader),
            process: Some(process),
        }
    }

    /// Reads the next line without its trailing `\n` / `\r\n`.
    ///
    /// Returns `Ok(None)` at end of stream. Bytes are returned undecoded so the
    /// caller decides how to treat invalid UTF-8.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }

    /// Waits for the backing process to exit after end of stream.
    ///
    /// Returns `None` for feeds without a process. Dropping the feed instead
    /// kills the process.
    pub async fn close(mut self) -> Option<ExitStatus> {
        let mut process = self.process.take()?;
        match process.wait().await {
            Ok(status) => Some(status),
            Err(err) => {
                tracing::debug!(subsystem = "lifecycle", error = %err, "cannot reap feed process");
                None
            }
        }
    }
}

impl std::fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("process", &self.process.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

/// Opens the feed of one upstream server.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self) -> Result<EventFeed, FeedError>;

    /// Human-readable description of where the feed comes from, for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// SSH
// ---------------------------------------------------------------------------

/// Runs `gerrit stream-events` on a Gerrit server over SSH.
///
/// Authentication is left to the SSH client configuration (agent, keys,
/// `~/.ssh/config`).
#[derive(Debug, Clone)]
pub struct SshConnector {
    program: String,
    destination: String,
    port: Option<u16>,
}

impl SshConnector {
    pub fn new(destination: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            program: "ssh".to_string(),
            destination: destination.into(),
            port,
        }
    }

    /// Uses `program` instead of `ssh` from `PATH`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to the SSH program.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(self.destination.clone());
        args.push("gerrit".to_string());
        args.push("stream-events".to_string());
        args
    }
}

#[async_trait]
impl FeedConnector for SshConnector {
    async fn connect(&self) -> Result<EventFeed, FeedError> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FeedError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| FeedError::MissingStdout {
            program: self.program.clone(),
        })?;

        Ok(EventFeed::from_process(BufReader::new(stdout), child))
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program, self.args().join(" "))
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replays a file of recorded events, one JSON object per line.
#[derive(Debug, Clone)]
pub struct ReplayFileConnector {
    path: PathBuf,
}

impl ReplayFileConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedConnector for ReplayFileConnector {
    async fn connect(&self) -> Result<EventFeed, FeedError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| FeedError::Open {
                path: self.path.clone(),
                source,
            })?;
        Ok(EventFeed::from_reader(BufReader::new(file)))
    }

    fn describe(&self) -> String {
        format!("replay {}", self.path.display())
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
