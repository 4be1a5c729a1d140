//! I/O primitives for talking to the interpreter subprocess.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::ChildStdin;

use super::SENTINEL_PREFIX;

/// Completion marker for one command.
///
/// Each command gets a fresh random token, echoed to both stdout and stderr
/// after the command itself. Seeing the token on a stream means the command
/// is done writing to it.
#[derive(Debug, Clone)]
pub(crate) struct Sentinel {
    token: String,
}

impl Sentinel {
    pub(crate) fn new() -> Self {
        Self {
            token: format!("{SENTINEL_PREFIX}{}__", uuid::Uuid::new_v4().simple()),
        }
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// The line the interpreter prints once the command completes.
    pub(crate) fn marker(&self) -> String {
        format!("{}\n", self.token)
    }

    /// `command` followed by the echo lines that print the marker.
    pub(crate) fn script(&self, command: &str) -> String {
        format!(
            "{command}\n{}\n{}\n",
            self.stdout_echo(),
            self.stderr_echo()
        )
    }

    fn stdout_echo(&self) -> String {
        format!("echo \"{}\"", self.token)
    }

    fn stderr_echo(&self) -> String {
        format!("echo \"{}\" 1>&2", self.token)
    }

    /// Remove marker echoes and stale markers from collected output.
    ///
    /// Stale markers belong to earlier commands whose stderr arrived late.
    pub(crate) fn clean(&self, raw: &[u8]) -> String {
        let text = String::from_utf8_lossy(raw)
            .replace(&format!("{}\n", self.stderr_echo()), "")
            .replace(&format!("{}\n", self.stdout_echo()), "");

        if !text.contains(SENTINEL_PREFIX) {
            return text;
        }
        text.split_inclusive('\n')
            .filter(|line| !line.starts_with(SENTINEL_PREFIX))
            .collect()
    }
}

/// Writes command scripts to the interpreter's stdin.
///
/// A script interrupted mid-write is finished by the next [`send`](Self::send)
/// before anything new goes out, so the interpreter never sees half a script.
#[derive(Debug)]
pub struct CommandWriter {
    stdin: Option<ChildStdin>,
    unsent: Vec<u8>,
}

impl CommandWriter {
    /// Create a new writer from a child process stdin.
    pub fn new(stdin: ChildStdin) -> Self {
        Self {
            stdin: Some(stdin),
            unsent: Vec::new(),
        }
    }

    /// Queue `script` and write everything queued, then flush.
    ///
    /// Cancel safe: bytes not yet written stay queued.
    pub async fn send(&mut self, script: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"))?;
        self.unsent.extend_from_slice(script.as_bytes());

        while !self.unsent.is_empty() {
            let n = stdin.write(&self.unsent).await?;
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            self.unsent.drain(..n);
        }
        stdin.flush().await
    }

    /// Close stdin, signalling end of input to the interpreter.
    pub async fn close(&mut self) -> io::Result<()> {
        self.unsent.clear();
        match self.stdin.take() {
            Some(mut stdin) => stdin.shutdown().await,
            None => Ok(()),
        }
    }

    /// Whether stdin is still open.
    pub fn is_open(&self) -> bool {
        self.stdin.is_some()
    }
}

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drained {
    /// The marker was found.
    Marker,
    /// The stream ended first.
    Eof,
}

/// Reads an output stream up to per-command markers.
///
/// Bytes read so far are held by the reader itself until taken, so a drain
/// can be dropped and resumed without losing output. Bytes that arrive after
/// a marker are kept for the next drain.
#[derive(Debug)]
pub struct MarkedReader<R> {
    reader: R,
    pending: Vec<u8>,
    carry: Vec<u8>,
}

impl<R> MarkedReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a new reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            carry: Vec::new(),
        }
    }

    /// Read the stream until the pending bytes contain `marker`.
    ///
    /// On [`Drained::Marker`], the pending bytes end right before the marker
    /// and the rest is carried over. On EOF or error, they hold all bytes
    /// read. Either way, collect them with [`take_pending`](Self::take_pending).
    ///
    /// Cancel safe: a dropped drain keeps what it read, and a later drain for
    /// the same marker picks up where it stopped.
    pub async fn drain_until(&mut self, marker: &[u8]) -> io::Result<Drained> {
        self.pending.append(&mut self.carry);
        if self.take_marker(marker, 0) {
            return Ok(Drained::Marker);
        }

        let mut chunk = [0u8; 1024];
        loop {
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(Drained::Eof);
            }
            let searched = self
                .pending
                .len()
                .saturating_sub(marker.len().saturating_sub(1));
            self.pending.extend_from_slice(&chunk[..n]);
            if self.take_marker(marker, searched) {
                return Ok(Drained::Marker);
            }
        }
    }

    /// Take the bytes collected by the last drain.
    pub fn take_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    /// If `pending[from..]` contains `marker`, cut it there and carry the rest.
    fn take_marker(&mut self, marker: &[u8], from: usize) -> bool {
        let Some(pos) = find(&self.pending[from..], marker) else {
            return false;
        };
        let start = from + pos;
        self.carry = self.pending.split_off(start + marker.len());
        self.pending.truncate(start);
        true
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
