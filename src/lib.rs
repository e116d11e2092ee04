//! # mailgrab
//!
//! Async mailbox facade for tests and automation: send through SMTP, read an
//! IMAP inbox newest-first, filter messages and scrape text out of their HTML
//! bodies with CSS selectors.
//!
//! This crate provides:
//! - [`MailboxSession`]: one account with an optional send handle and an
//!   optional retrieve handle
//! - [`FilterCriteria`]: sender, subject and attachment filters
//! - [`Message::data`]: CSS selector extraction from the HTML body
//! - One-call helpers such as [`last_mail_and_data`] and
//!   [`create_random_account`] (disposable Ethereal mailboxes)
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailgrab::{last_mail_and_data, AccountConfig, FilterCriteria};
//!
//! # async fn example() -> mailgrab::Result<()> {
//! let config = AccountConfig::builder()
//!     .username("user@ethereal.email")
//!     .password("app-password")
//!     .imap("imap.ethereal.email", 993, true)
//!     .build()?;
//!
//! let filter = FilterCriteria::new().subject("Confirm your email");
//! let found = last_mail_and_data(&config, &filter, "a.confirm").await?;
//! println!("{}: {}", found.message.subject().unwrap_or_default(), found.data);
//! # Ok(())
//! # }
//! ```
//!
//! ## Sending and Receiving
//!
//! ```no_run
//! use mailgrab::{create_random_account, FilterCriteria};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = create_random_account().await?;
//!
//! let message = lettre::Message::builder()
//!     .from(session.username().parse()?)
//!     .to(session.username().parse()?)
//!     .subject("Hello")
//!     .header(lettre::message::header::ContentType::TEXT_HTML)
//!     .body(String::from(r#"<p class="greeting">Hi there</p>"#))?;
//! session.send_mail(message).await?;
//!
//! if let Some(mail) = session.last_mail(&FilterCriteria::new().subject("Hello")).await? {
//!     assert_eq!(mail.data(".greeting")?, "Hi there");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Not Found vs Absent
//!
//! [`MailboxSession::last_mail`] and the `account_*` helpers return `Ok(None)`
//! when nothing matches. [`last_mail_data`] and [`last_mail_and_data`] demand
//! a message and fail with [`Error::NotFound`] ("No email found") instead.
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and carry the collaborator error as
//! their source. Use [`Error::is_retryable`] to decide whether to retry:
//!
//! ```
//! use mailgrab::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_retryable() {
//!         println!("Transient error, can retry: {}", error);
//!     } else {
//!         println!("Permanent error: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` and writes nothing to stdout or stderr. A message
//! without an HTML body queried with [`Message::data`] emits a `warn` event.
//!
//! ### Span Naming Convention
//!
//! - `MailboxSession::all_mails` - Inbox retrieval
//! - `MailboxSession::send_mail` - Sending
//! - `session::retrieve` - Connect, read and logout
//! - `ImapConnector::connect` - IMAP connection and login
//! - `imap::fetch` - One message fetch
//! - `SmtpSender::send` - SMTP transaction
//! - `EtherealProvisioner::provision` - Test account creation
//!
//! ### Standard Fields
//!
//! - `username` - Account username
//! - `imap_host` / `smtp_host` - Server hostname
//! - `uid` - Message UID
//! - `uid_count` - Number of messages listed

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod filter;
pub mod inbound;
pub mod message;
pub mod outbound;
pub mod provision;
pub mod session;

// Internal modules
mod connection;
mod helpers;
mod imap;
mod parser;

#[cfg(test)]
mod test_support;

// Re-exports for ergonomic API
pub use config::{AccountConfig, AccountConfigBuilder, Channel, ServerEndpoint};
pub use error::{ChannelKind, Error, ErrorCategory, Result};
pub use filter::FilterCriteria;
pub use helpers::{
    account_last_mail, account_last_mail_and_data, account_last_mail_data, create_account,
    create_random_account, create_random_account_with, get_data_by_mail, last_mail,
    last_mail_and_data, last_mail_data, MailAndData,
};
pub use inbound::{ImapConnector, MailboxConnection, MailboxConnector, RawMessage};
pub use message::{
    AddressObject, Attachment, HeaderLine, HeaderValue, Headers, MailboxAddress, Message, Priority,
};
pub use outbound::{MailSender, SmtpSender};
pub use provision::{AccountProvisioner, EtherealProvisioner, ProvisionedAccount};
pub use session::MailboxSession;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _ = AccountConfig::builder();
        let _ = FilterCriteria::new();
        let _ = EtherealProvisioner::new();
        let _ = Channel::from_parts("", 0, false);
    }
}
