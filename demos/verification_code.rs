//! Demo: Read a verification code from the latest matching email.
//!
//! # Usage
//!
//! ```bash
//! export MAILGRAB_USERNAME="user@ethereal.email"
//! export MAILGRAB_PASSWORD="app-password"
//! export MAILGRAB_IMAP_HOST="imap.ethereal.email"
//! export MAILGRAB_SUBJECT="Your verification code"
//! export MAILGRAB_SELECTOR=".code"
//!
//! cargo run --example verification_code
//! ```

use mailgrab::{last_mail_and_data, AccountConfig, Error, FilterCriteria};
use std::env;

#[tokio::main]
async fn main() -> mailgrab::Result<()> {
    let username =
        env::var("MAILGRAB_USERNAME").expect("MAILGRAB_USERNAME environment variable required");
    let password =
        env::var("MAILGRAB_PASSWORD").expect("MAILGRAB_PASSWORD environment variable required");
    let imap_host =
        env::var("MAILGRAB_IMAP_HOST").expect("MAILGRAB_IMAP_HOST environment variable required");
    let subject = env::var("MAILGRAB_SUBJECT").unwrap_or_else(|_| "Your verification code".into());
    let selector = env::var("MAILGRAB_SELECTOR").unwrap_or_else(|_| ".code".into());

    let config = AccountConfig::builder()
        .username(username)
        .password(password)
        .imap(imap_host, 993, true)
        .build()?;

    let filter = FilterCriteria::new().subject(subject);

    match last_mail_and_data(&config, &filter, &selector).await {
        Ok(found) => {
            println!(
                "From: {}",
                found
                    .message
                    .from()
                    .map_or("<unknown>", |from| from.text.as_str())
            );
            println!("Code: {}", found.data.trim());
            Ok(())
        }
        Err(Error::NotFound) => {
            println!("No email found yet, try again once it has arrived");
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            println!("Transient {} error, retry later: {e}", e.category());
            Err(e)
        }
        Err(e) => Err(e),
    }
}
