//! The scanning task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use super::source::{ByteSource, ReadOutcome};
use super::{DEFAULT_CAPACITY, MSG_STALLED, MSG_TIMEOUT, READ_CHUNK_SIZE};

/// Scan `source` into a channel of lines.
///
/// Returns immediately. A background task owns `source`, sends each line in
/// arrival order and closes the channel when the source ends, fails, stalls
/// or stays silent for longer than `timeout`. The source is closed exactly
/// once on every path.
///
/// Must be called from within a tokio runtime.
pub fn scan<S>(timeout: Duration, label: impl Into<String>, source: S) -> mpsc::Receiver<String>
where
    S: ByteSource,
{
    scan_with_capacity(timeout, label, source, DEFAULT_CAPACITY)
}

/// Like [`scan`], with an explicit channel capacity (at least 1).
///
/// The task stops reading while the channel is full.
pub fn scan_with_capacity<S>(
    timeout: Duration,
    label: impl Into<String>,
    source: S,
    capacity: usize,
) -> mpsc::Receiver<String>
where
    S: ByteSource,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let scan = Scan {
        source,
        label: label.into(),
        timeout,
        tx,
        pending: Vec::with_capacity(READ_CHUNK_SIZE),
        stalls: 0,
    };
    tokio::spawn(scan.run());
    rx
}

/// How a scan ended.
#[derive(Debug)]
enum Outcome {
    Finished,
    TimedOut,
    Stalled,
    Failed(std::io::Error),
    /// The receiver was dropped.
    Abandoned,
}

struct Scan<S> {
    source: S,
    label: String,
    timeout: Duration,
    tx: mpsc::Sender<String>,
    /// Bytes of the line currently being assembled.
    pending: Vec<u8>,
    /// Consecutive reads that returned no data and no error.
    stalls: u32,
}

impl<S: ByteSource> Scan<S> {
    async fn run(mut self) {
        let outcome = self.read_loop().await;

        match &outcome {
            Outcome::Finished => {
                tracing::debug!(label = %self.label, "source exhausted");
            }
            Outcome::TimedOut => {
                tracing::warn!(label = %self.label, timeout = ?self.timeout, "source timed out");
            }
            Outcome::Stalled => {
                tracing::warn!(label = %self.label, "source returned no data repeatedly");
            }
            Outcome::Failed(e) => {
                tracing::warn!(label = %self.label, error = %e, "source read failed");
            }
            Outcome::Abandoned => {
                tracing::debug!(label = %self.label, "line receiver dropped");
            }
        }

        if let Err(e) = self.source.close() {
            tracing::debug!(label = %self.label, error = %e, "closing source failed");
        }
        // Dropping self drops the sender, which closes the channel.
    }

    async fn read_loop(&mut self) -> Outcome {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        let mut deadline = Instant::now() + self.timeout;

        loop {
            let read = match timeout_at(deadline, self.source.read(&mut chunk)).await {
                Ok(read) => read,
                Err(_) => {
                    return self.finish_with(MSG_TIMEOUT, Outcome::TimedOut).await;
                }
            };

            match read {
                Ok(ReadOutcome::Data(n)) => {
                    deadline = Instant::now() + self.timeout;
                    self.stalls = 0;
                    self.pending.extend_from_slice(&chunk[..n]);
                    for line in split_lines(&mut self.pending) {
                        if self.tx.send(line).await.is_err() {
                            return Outcome::Abandoned;
                        }
                    }
                }
                Ok(ReadOutcome::Empty) => {
                    self.stalls += 1;
                    if self.stalls > 1 {
                        return self.finish_with(MSG_STALLED, Outcome::Stalled).await;
                    }
                }
                Ok(ReadOutcome::Eof) => {
                    if !self.pending.is_empty() {
                        let tail = decode_line(&self.pending);
                        self.pending.clear();
                        if self.tx.send(tail).await.is_err() {
                            return Outcome::Abandoned;
                        }
                    }
                    return Outcome::Finished;
                }
                Err(e) => return Outcome::Failed(e),
            }
        }
    }

    /// Send one diagnostic payload and end with `outcome`.
    async fn finish_with(&mut self, message: &str, outcome: Outcome) -> Outcome {
        match self.tx.send(message.to_string()).await {
            Ok(()) => outcome,
            Err(_) => Outcome::Abandoned,
        }
    }
}

/// Remove every complete line from `pending`, leaving the partial tail.
fn split_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = pending[start..].iter().position(|&b| b == b'\n') {
        let end = start + offset;
        lines.push(decode_line(&pending[start..end]));
        start = end + 1;
    }
    pending.drain(..start);
    lines
}

/// Decode one line, dropping a trailing carriage return.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
