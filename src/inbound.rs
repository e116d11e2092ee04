//! Inbound retrieval seam.
//!
//! A [`MailboxConnector`] is the inbound handle of a session: it holds
//! connection parameters and performs no I/O until [`connect`](MailboxConnector::connect)
//! is called. Each call yields a fresh [`MailboxConnection`] that lives for one
//! retrieval and is consumed by [`logout`](MailboxConnection::logout).
//!
//! [`ImapConnector`] is the IMAP implementation. Implement the traits yourself
//! to plug in another mailbox backend.

use crate::error::Result;
use async_trait::async_trait;

pub use crate::imap::ImapConnector;

/// One message as returned by the mailbox, before MIME parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Identifier assigned by the mailbox.
    pub uid: u32,
    /// Subject as reported by the envelope, if the server sent one.
    pub envelope_subject: Option<String>,
    /// Full RFC 5322 source.
    pub source: Vec<u8>,
}

/// Factory for mailbox connections.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Opens and authenticates a new connection.
    async fn connect(&self) -> Result<Box<dyn MailboxConnection>>;

    /// Human-readable description of the target, used in logs.
    fn describe(&self) -> String;
}

/// An open, authenticated mailbox connection.
///
/// Methods take `&self` so that several fetches can be in flight at once;
/// implementations serialize access to the underlying connection themselves.
#[async_trait]
pub trait MailboxConnection: Send + Sync {
    /// Selects the mailbox subsequent calls operate on.
    async fn select(&self, mailbox: &str) -> Result<()>;

    /// Returns every message identifier in the selected mailbox, in ascending
    /// assignment order.
    async fn search_all(&self) -> Result<Vec<u32>>;

    /// Fetches envelope, structure and full source of one message.
    async fn fetch(&self, uid: u32) -> Result<RawMessage>;

    /// Ends the session and closes the connection.
    async fn logout(self: Box<Self>) -> Result<()>;
}
