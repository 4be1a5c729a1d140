//! [`futures::Stream`] view over a scanner channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;

/// Lines from a scan as an async stream.
///
/// Created with [`LineStream::new`] from the receiver returned by
/// [`scan`](super::scan). Ends when the scanner closes its channel.
#[derive(Debug)]
pub struct LineStream {
    rx: mpsc::Receiver<String>,
}

impl LineStream {
    /// Wrap a scanner receiver.
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// Give back the underlying receiver.
    pub fn into_inner(self) -> mpsc::Receiver<String> {
        self.rx
    }
}

impl From<mpsc::Receiver<String>> for LineStream {
    fn from(rx: mpsc::Receiver<String>) -> Self {
        Self::new(rx)
    }
}

impl futures::Stream for LineStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
