//! Line scanning with an inactivity timeout.
//!
//! [`scan`] turns a [`ByteSource`] into a channel of text lines. The work
//! happens in a background task; the caller drains the returned receiver
//! until it closes.
//!
//! # Diagnostics on the channel
//!
//! Failures that the consumer should see are sent as ordinary lines, then
//! the channel closes:
//!
//! - [`MSG_TIMEOUT`] when the source produced nothing for `timeout`
//! - [`MSG_STALLED`] when the source returned no data and no error twice in a row
//!
//! End of stream and read errors just close the channel.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use blockrun::scanner::{scan, ReaderSource, MSG_TIMEOUT};
//!
//! let mut lines = scan(Duration::from_secs(5), "stdout", ReaderSource::new(stdout));
//! while let Some(line) = lines.recv().await {
//!     if line == MSG_TIMEOUT {
//!         eprintln!("no output for 5s");
//!         break;
//!     }
//!     println!("{line}");
//! }
//! ```

mod scan;
mod source;
mod stream;

pub use scan::{scan, scan_with_capacity};
pub use source::{ByteSource, ReadOutcome, ReaderSource};
pub use stream::LineStream;

/// Marker token for scanner error payloads.
pub const MSG_ERROR: &str = "error";

/// Sent when the source stays silent for longer than the timeout.
pub const MSG_TIMEOUT: &str = "timeout";

/// Sent when the source keeps returning neither data nor an error.
pub const MSG_STALLED: &str = "error : multiple Read calls return no data or error";

/// Channel capacity used by [`scan`].
pub const DEFAULT_CAPACITY: usize = 64;

/// Size of each read issued against the source.
pub(crate) const READ_CHUNK_SIZE: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalled_message_is_an_error_payload() {
        assert!(MSG_STALLED.starts_with(MSG_ERROR));
        assert_eq!(
            MSG_STALLED,
            format!("{MSG_ERROR} : multiple Read calls return no data or error")
        );
    }

    #[test]
    fn capacity_is_reasonable() {
        assert!(DEFAULT_CAPACITY >= 1);
        assert!(READ_CHUNK_SIZE >= 512);
    }
}
