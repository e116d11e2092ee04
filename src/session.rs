//! Mailbox session: one account, an optional outbound handle and an optional
//! inbound handle.
//!
//! Handles are built eagerly by [`MailboxSession::new`] from whichever channels
//! the [`AccountConfig`] enables. Building a handle performs no network I/O; an
//! unconfigured channel only fails when an operation needs it.
//!
//! # Example
//!
//! ```no_run
//! use mailgrab::{AccountConfig, FilterCriteria, MailboxSession};
//!
//! # async fn example() -> mailgrab::Result<()> {
//! let config = AccountConfig::builder()
//!     .username("user@ethereal.email")
//!     .password("secret")
//!     .imap("imap.ethereal.email", 993, true)
//!     .build()?;
//!
//! let mut session = MailboxSession::new(config)?;
//! let latest = session.last_mail(&FilterCriteria::new()).await?;
//! if let Some(message) = latest {
//!     println!("{:?}", message.subject());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::AccountConfig;
use crate::error::{ChannelKind, Error, Result};
use crate::filter::FilterCriteria;
use crate::inbound::{ImapConnector, MailboxConnection, MailboxConnector, RawMessage};
use crate::message::Message;
use crate::outbound::{MailSender, SmtpSender};
use futures::future::try_join_all;
use lettre::transport::smtp::response::Response;
use tracing::{debug, instrument, warn};

/// Mailbox every retrieval reads from.
const INBOX: &str = "INBOX";

/// One account with its send and retrieve capabilities.
///
/// # Concurrency
///
/// Retrieval methods take `&mut self`: each call connects, reads the inbox and
/// logs out, and two retrievals may not share a session at the same time.
/// Sending only needs `&self`.
///
/// No timeouts are applied; wrap calls in [`tokio::time::timeout`] if you need
/// a deadline.
pub struct MailboxSession {
    config: AccountConfig,
    outbound: Option<Box<dyn MailSender>>,
    inbound: Option<Box<dyn MailboxConnector>>,
}

impl MailboxSession {
    /// Builds the handles for every enabled channel of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpSetup`] if the SMTP transport cannot be built for
    /// the outbound host. Disabled channels never cause an error.
    pub fn new(config: AccountConfig) -> Result<Self> {
        let outbound = match config.outbound.endpoint() {
            Some(endpoint) => {
                let sender =
                    SmtpSender::new(endpoint.clone(), config.username(), config.password())?;
                Some(Box::new(sender) as Box<dyn MailSender>)
            }
            None => None,
        };

        let inbound = config.inbound.endpoint().map(|endpoint| {
            Box::new(ImapConnector::new(
                endpoint.clone(),
                config.username(),
                config.password(),
            )) as Box<dyn MailboxConnector>
        });

        debug!(
            username = %config.username(),
            outbound = outbound.is_some(),
            inbound = inbound.is_some(),
            "Session created"
        );

        Ok(Self {
            config,
            outbound,
            inbound,
        })
    }

    /// Builds a session around caller-supplied handles.
    ///
    /// The handles are used as given; the channels of `config` are not
    /// consulted.
    #[must_use]
    pub fn from_parts(
        config: AccountConfig,
        outbound: Option<Box<dyn MailSender>>,
        inbound: Option<Box<dyn MailboxConnector>>,
    ) -> Self {
        Self {
            config,
            outbound,
            inbound,
        }
    }

    /// Returns the account configuration.
    #[must_use]
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Returns the account username.
    #[must_use]
    pub fn username(&self) -> &str {
        self.config.username()
    }

    /// Returns the account password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.config.password()
    }

    /// Returns `true` if the session can send.
    #[must_use]
    pub fn has_outbound(&self) -> bool {
        self.outbound.is_some()
    }

    /// Returns `true` if the session can retrieve.
    #[must_use]
    pub fn has_inbound(&self) -> bool {
        self.inbound.is_some()
    }

    /// Retrieves every message in the inbox that matches `filter`, newest first.
    ///
    /// Order follows the mailbox identifiers, highest first, regardless of the
    /// order in which fetches complete.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConfigured`] if there is no inbound handle; nothing is
    ///   attempted over the network.
    /// - Any connect, select, search, fetch or logout error, unchanged. No
    ///   partial results are returned.
    /// - [`Error::ParseEmail`] or [`Error::ExtractBody`] if a source cannot be
    ///   parsed.
    #[instrument(
        name = "MailboxSession::all_mails",
        skip_all,
        fields(username = %self.config.username())
    )]
    pub async fn all_mails(&mut self, filter: &FilterCriteria) -> Result<Vec<Message>> {
        let inbound = self.inbound.as_deref().ok_or(Error::NotConfigured {
            channel: ChannelKind::Inbound,
        })?;

        let raw = retrieve(inbound).await?;

        let messages = raw
            .iter()
            .map(|raw| Message::parse(&raw.source))
            .collect::<Result<Vec<_>>>()?;

        let total = messages.len();
        let kept: Vec<Message> = messages
            .into_iter()
            .filter(|message| filter.matches(message))
            .collect();

        debug!(total, kept = kept.len(), "Filtered messages");

        Ok(kept)
    }

    /// Retrieves the newest message matching `filter`.
    ///
    /// Returns `Ok(None)` when nothing matches; that is not an error here.
    ///
    /// # Errors
    ///
    /// Same as [`all_mails`](Self::all_mails).
    pub async fn last_mail(&mut self, filter: &FilterCriteria) -> Result<Option<Message>> {
        Ok(self.all_mails(filter).await?.into_iter().next())
    }

    /// Sends `message` and returns the server response unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConfigured`] if there is no outbound handle; nothing is
    ///   attempted over the network.
    /// - [`Error::SmtpSend`] if the transport fails.
    #[instrument(
        name = "MailboxSession::send_mail",
        skip_all,
        fields(username = %self.config.username())
    )]
    pub async fn send_mail(&self, message: lettre::Message) -> Result<Response> {
        let outbound = self.outbound.as_deref().ok_or(Error::NotConfigured {
            channel: ChannelKind::Outbound,
        })?;

        outbound.send(message).await
    }
}

impl std::fmt::Debug for MailboxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxSession")
            .field("username", &self.config.username())
            .field("outbound", &self.has_outbound())
            .field(
                "inbound",
                &self.inbound.as_ref().map(|inbound| inbound.describe()),
            )
            .finish_non_exhaustive()
    }
}

/// Connects, reads the inbox and logs out, whatever happened in between.
///
/// A logout failure is returned only if reading succeeded; otherwise it is
/// logged and the reading error wins.
#[instrument(name = "session::retrieve", skip_all, fields(target = %connector.describe()))]
async fn retrieve(connector: &dyn MailboxConnector) -> Result<Vec<RawMessage>> {
    let connection = connector.connect().await?;
    let result = read_inbox(connection.as_ref()).await;
    let logout = connection.logout().await;

    match (result, logout) {
        (Ok(raw), Ok(())) => Ok(raw),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(logout_error)) => {
            warn!(error = %logout_error, "Logout failed after retrieval error");
            Err(error)
        }
    }
}

async fn read_inbox(connection: &dyn MailboxConnection) -> Result<Vec<RawMessage>> {
    connection.select(INBOX).await?;

    let mut uids = connection.search_all().await?;
    uids.reverse();

    debug!(uid_count = uids.len(), "Fetching messages");

    // All fetches are issued before any is awaited; results keep issue order.
    try_join_all(uids.into_iter().map(|uid| connection.fetch(uid))).await
}
