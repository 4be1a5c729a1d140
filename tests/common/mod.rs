//! Test utilities for blockrun integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blockrun::scanner::{ByteSource, ReadOutcome};

/// Counts how often a source was closed and how often it was read.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    closes: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// One scripted step of a [`MockSource`].
#[derive(Debug)]
pub enum Step {
    Bytes(Vec<u8>),
    Empty,
    Fail(io::ErrorKind),
    Stall(Duration),
}

/// A source that plays back scripted reads, then reports EOF.
pub struct MockSource {
    steps: VecDeque<Step>,
    probe: Probe,
}

impl MockSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            probe: Probe::new(),
        }
    }

    /// A source yielding `text` in one read.
    pub fn text(text: &str) -> Self {
        Self::new(vec![Step::Bytes(text.as_bytes().to_vec())])
    }

    /// A source yielding each chunk in its own read.
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::new(
            chunks
                .iter()
                .map(|c| Step::Bytes(c.as_bytes().to_vec()))
                .collect(),
        )
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl ByteSource for MockSource {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        self.probe.record_read();
        match self.steps.pop_front() {
            None => Ok(ReadOutcome::Eof),
            Some(Step::Bytes(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Bytes(bytes.split_off(n)));
                }
                Ok(ReadOutcome::Data(n))
            }
            Some(Step::Empty) => Ok(ReadOutcome::Empty),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "mock read failure")),
            Some(Step::Stall(d)) => {
                tokio::time::sleep(d).await;
                Ok(ReadOutcome::Empty)
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.probe.record_close();
        Ok(())
    }
}

/// A source whose reads block for a long time, then return nothing.
pub struct StalledSource {
    probe: Probe,
}

impl StalledSource {
    pub fn new() -> Self {
        Self { probe: Probe::new() }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl ByteSource for StalledSource {
    async fn read(&mut self, _buf: &mut [u8]) -> io::Result<ReadOutcome> {
        self.probe.record_read();
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ReadOutcome::Empty)
    }

    fn close(&mut self) -> io::Result<()> {
        self.probe.record_close();
        Ok(())
    }
}

/// A source that always returns no data and no error.
pub struct BustedSource {
    probe: Probe,
}

impl BustedSource {
    pub fn new() -> Self {
        Self { probe: Probe::new() }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl ByteSource for BustedSource {
    async fn read(&mut self, _buf: &mut [u8]) -> io::Result<ReadOutcome> {
        self.probe.record_read();
        Ok(ReadOutcome::Empty)
    }

    fn close(&mut self) -> io::Result<()> {
        self.probe.record_close();
        Ok(())
    }
}

/// A source producing `count` numbered lines, one per read.
pub struct CountingSource {
    next: usize,
    count: usize,
    probe: Probe,
}

impl CountingSource {
    pub fn new(count: usize) -> Self {
        Self {
            next: 0,
            count,
            probe: Probe::new(),
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl ByteSource for CountingSource {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        self.probe.record_read();
        if self.next == self.count {
            return Ok(ReadOutcome::Eof);
        }
        let line = format!("line {}\n", self.next);
        self.next += 1;
        buf[..line.len()].copy_from_slice(line.as_bytes());
        Ok(ReadOutcome::Data(line.len()))
    }

    fn close(&mut self) -> io::Result<()> {
        self.probe.record_close();
        Ok(())
    }
}

/// Drain a scanner receiver into a Vec.
pub async fn collect(mut rx: tokio::sync::mpsc::Receiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line);
    }
    lines
}

/// Path of a shell to run interpreter tests against.
///
/// Prefers `/bin/bash`, falls back to `/bin/sh`.
pub fn shell_path() -> String {
    ["/bin/bash", "/bin/sh"]
        .into_iter()
        .find(|p| std::path::Path::new(p).exists())
        .expect("neither /bin/bash nor /bin/sh found")
        .to_string()
}

/// Install a tracing subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
