// SPDX-License-Identifier: MIT
//! Lifecycle of one language-server subprocess.
//!
//! Each WebSocket connection owns exactly one [`LanguageServer`]. The child's
//! stdout is drained by a spawned reader task so a blocked pipe can never
//! stall the connection's event loop; decoded messages arrive on the mpsc
//! receiver returned by [`LanguageServer::spawn`].

use serde_json::Value;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::lsp::error::RelayError;
use crate::lsp::framing;

/// Channel capacity for subprocess → client messages. The relay applies no
/// batching, so this only absorbs short bursts while a client send is in
/// flight.
const INBOUND_CHANNEL_CAPACITY: usize = 64;

/// A live language-server subprocess with framed stdio.
#[derive(Debug)]
pub struct LanguageServer {
    child: Child,
    stdin: ChildStdin,
    reader: JoinHandle<()>,
}

impl LanguageServer {
    /// Spawn `command` with piped stdin/stdout and start the inbound reader
    /// task.
    ///
    /// Returns the server handle (owning the writer half) plus the receiver
    /// carrying every decoded message. The receiver yields `Err` exactly once
    /// if the stream turns malformed, then closes; it closes silently on a
    /// clean end-of-stream.
    pub fn spawn(
        command: &[String],
        max_frame_bytes: usize,
    ) -> Result<(Self, mpsc::Receiver<Result<Value, RelayError>>), RelayError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| RelayError::Launch(std::io::Error::other("empty server command")))?;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(RelayError::Launch)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RelayError::Launch(std::io::Error::other("stdin not piped")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Launch(std::io::Error::other("stdout not piped")))?;

        debug!(program = %program, pid = ?child.id(), "language server spawned");

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_loop(BufReader::new(stdout), tx, max_frame_bytes));

        Ok((
            Self {
                child,
                stdin,
                reader,
            },
            rx,
        ))
    }

    /// OS process id, if the child is still running.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Frame `message` onto the subprocess stdin.
    pub async fn write(&mut self, message: &Value) -> Result<(), RelayError> {
        framing::write_message(&mut self.stdin, message).await
    }

    /// Stop the reader task and kill the subprocess.
    ///
    /// Called on every connection exit path; `kill_on_drop` covers the rest.
    pub async fn shutdown(mut self) {
        self.reader.abort();
        if let Err(e) = self.child.kill().await {
            warn!(err = %e, "failed to kill language server");
        }
        debug!("language server stopped");
    }
}

/// Inbound reader loop: AwaitingHeader → AwaitingPayload → Dispatch, until
/// end-of-stream (clean stop) or a decode error (reported once, then stop).
async fn read_loop(
    mut stdout: BufReader<tokio::process::ChildStdout>,
    tx: mpsc::Sender<Result<Value, RelayError>>,
    max_frame_bytes: usize,
) {
    loop {
        match framing::read_message(&mut stdout, max_frame_bytes).await {
            Ok(Some(message)) => {
                if tx.send(Ok(message)).await.is_err() {
                    // Connection is gone — nobody left to deliver to.
                    break;
                }
            }
            Ok(None) => {
                debug!("language server closed stdout");
                break;
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}
