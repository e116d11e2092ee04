//! Demo: Using tracing for observability.
//!
//! mailgrab emits spans for retrieval, IMAP login and fetches, and a `warn`
//! event when a selector is run against a message without an HTML body.
//!
//! # Usage
//!
//! ```bash
//! export MAILGRAB_USERNAME="user@ethereal.email"
//! export MAILGRAB_PASSWORD="app-password"
//! export MAILGRAB_IMAP_HOST="imap.ethereal.email"
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=mailgrab=debug
//!
//! cargo run --example with_tracing
//! ```

use mailgrab::{AccountConfig, FilterCriteria, MailboxSession};
use std::env;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> mailgrab::Result<()> {
    // RUST_LOG controls the level, e.g. RUST_LOG=mailgrab=debug,info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mailgrab=info")),
        )
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let username =
        env::var("MAILGRAB_USERNAME").expect("MAILGRAB_USERNAME environment variable required");
    let password =
        env::var("MAILGRAB_PASSWORD").expect("MAILGRAB_PASSWORD environment variable required");
    let imap_host =
        env::var("MAILGRAB_IMAP_HOST").expect("MAILGRAB_IMAP_HOST environment variable required");

    tracing::info!(username = %username, "Starting mailgrab demo");

    let config = AccountConfig::builder()
        .username(username)
        .password(password)
        .imap(imap_host, 993, true)
        .build()?;

    let mut session = MailboxSession::new(config)?;

    // Spans: MailboxSession::all_mails > session::retrieve > ImapConnector::connect, imap::fetch
    let messages = session.all_mails(&FilterCriteria::new()).await?;
    tracing::info!(count = messages.len(), "Inbox read");

    for message in messages.iter().take(5) {
        // Plain-text messages trigger the "no HTML body" warn event here.
        let title = message.data("title")?;
        tracing::info!(
            subject = ?message.subject(),
            attachments = message.attachments().len(),
            title = %title,
            "Message"
        );
    }

    Ok(())
}
