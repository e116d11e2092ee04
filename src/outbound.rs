//! Outbound send seam.
//!
//! The message to send is a [`lettre::Message`]; its shape (recipients, body,
//! attachments) belongs to lettre. [`SmtpSender`] is the SMTP implementation.

use crate::config::ServerEndpoint;
use crate::error::{Error, Result};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};

/// Capability to transmit composed messages.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Sends one message and returns the server's final response.
    async fn send(&self, message: Message) -> Result<Response>;
}

/// Outbound handle for an SMTP server.
///
/// Construction builds the transport only; the first connection is made by
/// [`send`](MailSender::send).
pub struct SmtpSender {
    endpoint: ServerEndpoint,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    /// Builds an SMTP transport for the endpoint.
    ///
    /// Secure endpoints use implicit TLS; others upgrade with STARTTLS when the
    /// server offers it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpSetup`] if TLS parameters cannot be built for the host.
    pub fn new(endpoint: ServerEndpoint, username: &str, password: &str) -> Result<Self> {
        let credentials = Credentials::new(username.to_string(), password.to_string());

        let builder = if endpoint.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&endpoint.host)
        } else {
            TlsParameters::new(endpoint.host.clone()).map(|params| {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&endpoint.host)
                    .tls(Tls::Opportunistic(params))
            })
        }
        .map_err(|source| Error::SmtpSetup {
            host: endpoint.host.clone(),
            source,
        })?;

        let transport = builder
            .port(endpoint.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Returns the server this sender talks to.
    #[must_use]
    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }
}

impl std::fmt::Debug for SmtpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSender")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MailSender for SmtpSender {
    #[instrument(
        name = "SmtpSender::send",
        skip_all,
        fields(smtp_host = %self.endpoint.host, smtp_port = self.endpoint.port)
    )]
    async fn send(&self, message: Message) -> Result<Response> {
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|source| Error::SmtpSend { source })?;

        debug!(code = %response.code(), "Message accepted");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_secure_sender() {
        let sender = SmtpSender::new(
            ServerEndpoint::new("smtp.ethereal.email", 465, true),
            "user@ethereal.email",
            "secret",
        )
        .unwrap();
        assert_eq!(sender.endpoint().port, 465);
    }

    #[test]
    fn test_build_starttls_sender() {
        let sender = SmtpSender::new(
            ServerEndpoint::new("smtp.ethereal.email", 587, false),
            "user@ethereal.email",
            "secret",
        )
        .unwrap();

        let debug_str = format!("{sender:?}");
        assert!(debug_str.contains("smtp.ethereal.email"));
        assert!(!debug_str.contains("secret"));
    }
}
