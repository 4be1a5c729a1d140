//! Byte sources the scanner can consume.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Result of a single read from a [`ByteSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// At least one byte was written into the buffer.
    Data(usize),
    /// The read returned no data but did not signal end of stream.
    ///
    /// A well-behaved source blocks instead; the scanner tolerates this once.
    Empty,
    /// The source is exhausted.
    Eof,
}

/// A closable stream of bytes.
///
/// Unlike [`AsyncRead`], a source can report a zero-byte read that is not
/// the end of the stream, which is how misbehaving sources are detected.
pub trait ByteSource: Send + 'static {
    /// Read some bytes into `buf`.
    ///
    /// The returned future must be cancel safe: the scanner drops it when
    /// the inactivity timeout wins the race.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<ReadOutcome>> + Send;

    /// Release the underlying resource. Called exactly once by the scanner.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Adapts any tokio [`AsyncRead`] into a [`ByteSource`].
///
/// A zero-byte read is end of stream in `AsyncRead` terms, so this source
/// never reports [`ReadOutcome::Empty`]. Closing drops the reader.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: Option<R>,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "source closed"));
        };
        match reader.read(buf).await? {
            0 => Ok(ReadOutcome::Eof),
            n => Ok(ReadOutcome::Data(n)),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        Ok(())
    }
}

impl<R> From<R> for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn from(reader: R) -> Self {
        Self::new(reader)
    }
}
