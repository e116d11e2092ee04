//! Internal IMAP implementation of the inbound seam.
//!
//! This module wraps async-imap operations with proper error handling.

use crate::config::ServerEndpoint;
use crate::connection::{self, BoxedStream};
use crate::error::{Error, Result};
use crate::inbound::{MailboxConnection, MailboxConnector, RawMessage};
use async_imap::Session;
use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Type alias for an IMAP session over a plain or TLS stream.
type ImapSession = Session<BoxedStream>;

/// Items requested per message. `BODY.PEEK[]` leaves the `\Seen` flag alone.
const FETCH_ITEMS: &str = "(UID ENVELOPE BODYSTRUCTURE BODY.PEEK[])";

/// Authentication configuration for IMAP.
struct AuthConfig<'a> {
    username: &'a str,
    password: &'a str,
}

/// Inbound handle for an IMAP server.
///
/// Holds endpoint and credentials only; every [`connect`](MailboxConnector::connect)
/// opens a new connection.
#[derive(Clone)]
pub struct ImapConnector {
    endpoint: ServerEndpoint,
    username: String,
    password: SecretString,
}

impl ImapConnector {
    /// Creates a connector. Performs no I/O.
    #[must_use]
    pub fn new(
        endpoint: ServerEndpoint,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Returns the server this connector talks to.
    #[must_use]
    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }
}

impl std::fmt::Debug for ImapConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConnector")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    #[instrument(
        name = "ImapConnector::connect",
        skip_all,
        fields(imap_host = %self.endpoint.host, username = %self.username)
    )]
    async fn connect(&self) -> Result<Box<dyn MailboxConnection>> {
        let stream = connection::establish(&self.endpoint).await?;

        debug!("Connection established");

        let auth_config = AuthConfig {
            username: &self.username,
            password: self.password.expose_secret(),
        };
        let session = authenticate(stream, &auth_config).await?;

        debug!("Authenticated");

        Ok(Box::new(ImapConnection {
            session: Mutex::new(session),
        }))
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

/// Authenticates to IMAP server and returns a session.
#[instrument(
    name = "imap::authenticate",
    skip_all,
    fields(username = %config.username)
)]
async fn authenticate(stream: BoxedStream, config: &AuthConfig<'_>) -> Result<ImapSession> {
    let client = async_imap::Client::new(stream);

    debug!("Authenticating to IMAP server");

    client
        .login(config.username, config.password)
        .await
        .map_err(|e| Error::ImapLogin {
            username: config.username.to_string(),
            source: e.0,
        })
}

/// One authenticated IMAP session. Commands are serialized through the mutex.
struct ImapConnection {
    session: Mutex<ImapSession>,
}

#[async_trait]
impl MailboxConnection for ImapConnection {
    #[instrument(name = "imap::select", skip(self), fields(mailbox = %mailbox))]
    async fn select(&self, mailbox: &str) -> Result<()> {
        debug!("Selecting mailbox");

        self.session
            .lock()
            .await
            .select(mailbox)
            .await
            .map_err(|source| Error::SelectMailbox {
                mailbox: mailbox.to_string(),
                source,
            })?;

        Ok(())
    }

    #[instrument(name = "imap::search_all", skip(self))]
    async fn search_all(&self) -> Result<Vec<u32>> {
        let uids = self
            .session
            .lock()
            .await
            .uid_search("ALL")
            .await
            .map_err(|source| Error::ImapSearch { source })?;

        // The server answers with a set; restore assignment order.
        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();

        debug!(uid_count = uids.len(), "Listed mailbox");

        Ok(uids)
    }

    #[instrument(name = "imap::fetch", skip(self))]
    async fn fetch(&self, uid: u32) -> Result<RawMessage> {
        let mut session = self.session.lock().await;
        let mut stream = session
            .uid_fetch(uid.to_string(), FETCH_ITEMS)
            .await
            .map_err(|source| Error::ImapFetch { uid, source })?;

        let mut found = None;
        // Drain the whole response so the session is ready for the next command.
        while let Some(item) = stream.next().await {
            let fetch = item.map_err(|source| Error::FetchMessage { source })?;
            if found.is_some() || fetch.uid.is_some_and(|fetched| fetched != uid) {
                continue;
            }
            if let Some(body) = fetch.body() {
                let envelope_subject = fetch
                    .envelope()
                    .and_then(|envelope| envelope.subject.as_ref())
                    .map(|subject| String::from_utf8_lossy(subject).into_owned());
                found = Some(RawMessage {
                    uid,
                    envelope_subject,
                    source: body.to_vec(),
                });
            }
        }

        let message = found.ok_or(Error::MissingSource { uid })?;

        debug!(
            size = message.source.len(),
            subject = ?message.envelope_subject,
            "Fetched message"
        );

        Ok(message)
    }

    #[instrument(name = "imap::logout", skip(self))]
    async fn logout(self: Box<Self>) -> Result<()> {
        debug!("Logging out");

        self.session
            .into_inner()
            .logout()
            .await
            .map_err(|source| Error::ImapLogout { source })
    }
}
