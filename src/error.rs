//! Error types for the mailgrab crate.
//!
//! Errors raised by this crate itself are [`Error::NotConfigured`] and
//! [`Error::NotFound`]. Every other variant carries the failure of one of the
//! underlying libraries (IMAP, SMTP, MIME parsing, HTML querying, provisioning)
//! as its [`source`](std::error::Error::source), untouched.

use std::fmt;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of a [`MailboxSession`](crate::MailboxSession) an operation needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// The outbound (SMTP) channel.
    Outbound,
    /// The inbound (IMAP) channel.
    Inbound,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Outbound => write!(f, "SMTP server"),
            ChannelKind::Inbound => write!(f, "IMAP client"),
        }
    }
}

/// Errors that can occur during mailbox operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    /// The channel an operation needs was not configured for this session.
    #[error("{channel} is not configured")]
    NotConfigured {
        /// The missing channel.
        channel: ChannelKind,
    },

    /// Failed to build the SMTP transport from its endpoint.
    #[error("failed to set up SMTP transport for '{host}'")]
    SmtpSetup {
        /// The SMTP hostname.
        host: String,
        /// The underlying SMTP error.
        #[source]
        source: lettre::transport::smtp::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network / connection errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failed while exchanging the plaintext greeting or `STARTTLS`.
    #[error("IMAP handshake with {target} failed")]
    ImapHandshake {
        /// The target address.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server refused or garbled the plaintext `STARTTLS` exchange.
    #[error("STARTTLS negotiation with {target} failed: {response}")]
    StartTls {
        /// The target address.
        target: String,
        /// The offending server line.
        response: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors (RETRYABLE - could be transient server issues)
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP login failed.
    #[error("IMAP login failed for {username}")]
    ImapLogin {
        /// The username used for login.
        username: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to select mailbox.
    #[error("failed to select mailbox '{mailbox}'")]
    SelectMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP search failed.
    #[error("IMAP search failed")]
    ImapSearch {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP fetch failed.
    #[error("IMAP fetch failed for UID {uid}")]
    ImapFetch {
        /// The UID that failed.
        uid: u32,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to fetch message from stream.
    #[error("failed to fetch message from stream")]
    FetchMessage {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// The server answered a fetch without the message source.
    #[error("server returned no source for UID {uid}")]
    MissingSource {
        /// The UID whose source was missing.
        uid: u32,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // SMTP errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Sending a message over SMTP failed.
    #[error("failed to send email")]
    SmtpSend {
        /// The underlying SMTP error.
        #[source]
        source: lettre::transport::smtp::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Provisioning errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The provisioning API could not be reached or answered garbage.
    #[error("test account provisioning request failed")]
    ProvisionRequest {
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The provisioning API refused to create an account.
    #[error("test account provisioning rejected: {message}")]
    ProvisionRejected {
        /// Message reported by the API.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Content errors (NOT retryable - malformed content won't change)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse email message.
    #[error("failed to parse email")]
    ParseEmail {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    /// Failed to extract email body.
    #[error("failed to extract email body")]
    ExtractBody {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    /// The selector could not be parsed.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// The (trimmed) selector.
        selector: String,
        /// Parser diagnostic.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Search result errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// No email survived filtering where one was required.
    #[error("No email found")]
    NotFound,
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    ///
    /// The crate never retries on its own; this is a hint for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ImapHandshake { .. }
            | Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::SmtpSend { .. }
            | Error::ProvisionRequest { .. } => true,

            Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::NotConfigured { .. }
            | Error::SmtpSetup { .. }
            | Error::MissingSource { .. }
            | Error::StartTls { .. }
            | Error::ImapLogout { .. }
            | Error::ProvisionRejected { .. }
            | Error::ParseEmail { .. }
            | Error::ExtractBody { .. }
            | Error::InvalidSelector { .. }
            | Error::NotFound => false,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::NotConfigured { .. }
            | Error::SmtpSetup { .. } => ErrorCategory::Configuration,

            Error::TcpConnect { .. } | Error::TlsConnect { .. } | Error::ImapHandshake { .. } => {
                ErrorCategory::Network
            }

            Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::MissingSource { .. }
            | Error::StartTls { .. }
            | Error::ImapLogout { .. }
            | Error::SmtpSend { .. } => ErrorCategory::Protocol,

            Error::ProvisionRequest { .. } | Error::ProvisionRejected { .. } => {
                ErrorCategory::Provisioning
            }

            Error::ParseEmail { .. } | Error::ExtractBody { .. } | Error::InvalidSelector { .. } => {
                ErrorCategory::Parse
            }

            Error::NotFound => ErrorCategory::NotFound,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Network connectivity errors.
    Network,
    /// IMAP or SMTP protocol errors.
    Protocol,
    /// Test account provisioning errors.
    Provisioning,
    /// Email or selector parsing errors.
    Parse,
    /// No matching email found.
    NotFound,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Provisioning => write!(f, "provisioning"),
            ErrorCategory::Parse => write!(f, "parse"),
            ErrorCategory::NotFound => write!(f, "not_found"),
        }
    }
}
