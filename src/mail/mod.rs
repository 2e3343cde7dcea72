//! Mail source boundary — fetching raw unseen messages.
//!
//! The triage core only sees `RawMail` bytes; provider specifics stay
//! behind the `MailSource` trait. `imap` is the concrete transport.

pub mod imap;
pub mod normalize;

pub use imap::ImapSource;
pub use normalize::{CanonicalMessage, dedup_key, normalize};

use async_trait::async_trait;

use crate::error::MailError;

/// One unseen message as fetched from the transport, unparsed.
#[derive(Debug, Clone)]
pub struct RawMail {
    pub bytes: Vec<u8>,
}

/// Result of one unseen-message fetch.
#[derive(Debug, Clone)]
pub struct UnseenBatch {
    /// Up to `limit` most-recent unseen messages.
    pub messages: Vec<RawMail>,
    /// Total unseen count in the mailbox, independent of the batch cap.
    pub total_unseen: usize,
}

/// Trait for mail transports — pure I/O, no triage logic.
///
/// Implementations must fetch in a read-only mode that does not mark
/// messages as seen, so repeated scans observe the same unseen set.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Fetch up to `limit` most-recent unseen messages.
    async fn fetch_unseen(&self, limit: usize) -> Result<UnseenBatch, MailError>;
}
