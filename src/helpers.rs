//! One-call helpers for the common "read the latest mail" flows.
//!
//! Config-level helpers build a retrieval-only session for the call and raise
//! [`Error::NotFound`] when they are asked for data and nothing matches.
//! Session-level helpers (`account_*`) reuse an existing session and report
//! "nothing matched" as `None` instead.
//!
//! ```no_run
//! use mailgrab::{last_mail_and_data, AccountConfig, FilterCriteria};
//!
//! # async fn example() -> mailgrab::Result<()> {
//! let config = AccountConfig::builder()
//!     .username("user@ethereal.email")
//!     .password("secret")
//!     .imap("imap.ethereal.email", 993, true)
//!     .build()?;
//!
//! let filter = FilterCriteria::new().subject("Your verification code");
//! let found = last_mail_and_data(&config, &filter, ".code").await?;
//! println!("code: {}", found.data);
//! # Ok(())
//! # }
//! ```

use crate::config::AccountConfig;
use crate::error::{Error, Result};
use crate::filter::FilterCriteria;
use crate::message::Message;
use crate::provision::{AccountProvisioner, EtherealProvisioner};
use crate::session::MailboxSession;
use tracing::{debug, instrument};

/// A message together with the data extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAndData {
    /// The matching message.
    pub message: Message,
    /// Text selected from its HTML body.
    pub data: String,
}

/// Creates a session for `config`.
///
/// # Errors
///
/// See [`MailboxSession::new`].
pub fn create_account(config: AccountConfig) -> Result<MailboxSession> {
    MailboxSession::new(config)
}

/// Provisions a disposable Ethereal mailbox and creates a session for it.
///
/// # Errors
///
/// Returns [`Error::ProvisionRequest`] or [`Error::ProvisionRejected`] if the
/// mailbox cannot be created.
pub async fn create_random_account() -> Result<MailboxSession> {
    create_random_account_with(&EtherealProvisioner::new()).await
}

/// Provisions a mailbox through `provisioner` and creates a session for it.
///
/// # Errors
///
/// Returns whatever the provisioner returns, or a session construction error.
#[instrument(name = "helpers::create_random_account", skip_all)]
pub async fn create_random_account_with(
    provisioner: &dyn AccountProvisioner,
) -> Result<MailboxSession> {
    let account = provisioner.provision().await?;

    debug!(username = %account.username, "Creating session for provisioned account");

    MailboxSession::new(account.into_config())
}

/// Extracts `selector` text from `mail`. Same as [`Message::data`].
///
/// # Errors
///
/// Returns [`Error::InvalidSelector`] if `selector` does not parse.
pub fn get_data_by_mail(mail: &Message, selector: &str) -> Result<String> {
    mail.data(selector)
}

/// Retrieves the newest message matching `filter` using the inbound side of
/// `config`. The outbound side is never built.
///
/// # Errors
///
/// See [`MailboxSession::all_mails`].
pub async fn last_mail(config: &AccountConfig, filter: &FilterCriteria) -> Result<Option<Message>> {
    let mut session = MailboxSession::new(config.without_outbound())?;
    session.last_mail(filter).await
}

/// Retrieves the newest matching message and extracts `selector` from it.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no message matches, otherwise see
/// [`last_mail_and_data`].
pub async fn last_mail_data(
    config: &AccountConfig,
    filter: &FilterCriteria,
    selector: &str,
) -> Result<String> {
    last_mail_and_data(config, filter, selector)
        .await
        .map(|found| found.data)
}

/// Retrieves the newest matching message and extracts `selector` from it,
/// returning both.
///
/// # Errors
///
/// - [`Error::NotFound`] ("No email found") if no message matches.
/// - [`Error::InvalidSelector`] if `selector` does not parse.
/// - Any retrieval error, see [`MailboxSession::all_mails`].
#[instrument(name = "helpers::last_mail_and_data", skip_all, fields(username = %config.username()))]
pub async fn last_mail_and_data(
    config: &AccountConfig,
    filter: &FilterCriteria,
    selector: &str,
) -> Result<MailAndData> {
    let mut session = MailboxSession::new(config.without_outbound())?;
    required_mail_and_data(&mut session, filter, selector).await
}

async fn required_mail_and_data(
    session: &mut MailboxSession,
    filter: &FilterCriteria,
    selector: &str,
) -> Result<MailAndData> {
    account_last_mail_and_data(session, filter, selector)
        .await?
        .ok_or(Error::NotFound)
}

/// Retrieves the newest matching message through an existing session.
///
/// # Errors
///
/// See [`MailboxSession::all_mails`].
pub async fn account_last_mail(
    session: &mut MailboxSession,
    filter: &FilterCriteria,
) -> Result<Option<Message>> {
    session.last_mail(filter).await
}

/// Extracts `selector` from the newest matching message of an existing
/// session. `None` if nothing matches.
///
/// # Errors
///
/// See [`account_last_mail_and_data`].
pub async fn account_last_mail_data(
    session: &mut MailboxSession,
    filter: &FilterCriteria,
    selector: &str,
) -> Result<Option<String>> {
    Ok(account_last_mail_and_data(session, filter, selector)
        .await?
        .map(|found| found.data))
}

/// Returns the newest matching message of an existing session together with
/// its `selector` data. `None` if nothing matches.
///
/// # Errors
///
/// - [`Error::InvalidSelector`] if `selector` does not parse.
/// - Any retrieval error, see [`MailboxSession::all_mails`].
pub async fn account_last_mail_and_data(
    session: &mut MailboxSession,
    filter: &FilterCriteria,
    selector: &str,
) -> Result<Option<MailAndData>> {
    let Some(message) = session.last_mail(filter).await? else {
        debug!("No message matched");
        return Ok(None);
    };

    let data = message.data(selector)?;

    Ok(Some(MailAndData { message, data }))
}
