//! Account configuration for a mailbox session.
//!
//! Use [`AccountConfigBuilder`] to describe the account. Each channel is either
//! [`Channel::Disabled`] or [`Channel::Enabled`]; a session only builds the
//! handles whose channel is enabled.
//!
//! ```
//! use mailgrab::AccountConfig;
//!
//! let config = AccountConfig::builder()
//!     .username("user@example.com")
//!     .password("app-password")
//!     .imap("imap.example.com", 993, true)
//!     .build()
//!     .expect("valid config");
//!
//! assert!(config.inbound.is_enabled());
//! assert!(!config.outbound.is_enabled());
//! ```

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;

/// Host, port and transport security of one mail server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerEndpoint {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// `true` for implicit TLS, `false` for a plaintext start upgraded with
    /// STARTTLS when the server offers it.
    pub secure: bool,
}

impl ServerEndpoint {
    /// Creates a new endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
        }
    }

    /// Returns the server address as "host:port".
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "tls" } else { "plain" };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}

/// Whether one side (outbound or inbound) of an account is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Channel {
    /// The side is not used.
    #[default]
    Disabled,
    /// The side talks to the given server.
    Enabled(ServerEndpoint),
}

impl Channel {
    /// Builds a channel from loose parts.
    ///
    /// An empty host or a zero port yields [`Channel::Disabled`].
    #[must_use]
    pub fn from_parts(host: impl Into<String>, port: u16, secure: bool) -> Self {
        let host = host.into();
        if host.is_empty() || port == 0 {
            Channel::Disabled
        } else {
            Channel::Enabled(ServerEndpoint::new(host, port, secure))
        }
    }

    /// Returns `true` if the channel is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Channel::Enabled(_))
    }

    /// Returns the endpoint if the channel is enabled.
    #[must_use]
    pub fn endpoint(&self) -> Option<&ServerEndpoint> {
        match self {
            Channel::Enabled(endpoint) => Some(endpoint),
            Channel::Disabled => None,
        }
    }
}

impl From<ServerEndpoint> for Channel {
    fn from(endpoint: ServerEndpoint) -> Self {
        Channel::from_parts(endpoint.host, endpoint.port, endpoint.secure)
    }
}

/// Configuration of one mail account: an outbound channel, an inbound channel
/// and the credentials shared by both.
///
/// Create using [`AccountConfig::builder()`].
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of sensitive credentials.
#[derive(Clone)]
pub struct AccountConfig {
    /// Outbound (SMTP) channel.
    pub outbound: Channel,
    /// Inbound (IMAP) channel.
    pub inbound: Channel,
    username: String,
    password: SecretString,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("outbound", &self.outbound)
            .field("inbound", &self.inbound)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl AccountConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> AccountConfigBuilder {
        AccountConfigBuilder::default()
    }

    pub(crate) fn from_channels(
        outbound: Channel,
        inbound: Channel,
        username: String,
        password: String,
    ) -> Self {
        Self {
            outbound,
            inbound,
            username,
            password: SecretString::from(password),
        }
    }

    /// Returns the username used for both servers.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password as a string slice.
    ///
    /// The password is intentionally not a public field to prevent accidental logging.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns a copy of this configuration with the outbound channel disabled.
    #[must_use]
    pub fn without_outbound(&self) -> Self {
        Self {
            outbound: Channel::Disabled,
            ..self.clone()
        }
    }
}

/// Builder for [`AccountConfig`].
#[derive(Debug, Default)]
pub struct AccountConfigBuilder {
    username: Option<String>,
    password: Option<String>,
    outbound: Channel,
    inbound: Channel,
}

impl AccountConfigBuilder {
    /// Sets the username (required).
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password (required).
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Configures the outbound SMTP server.
    ///
    /// An empty host or a zero port leaves outbound disabled.
    #[must_use]
    pub fn smtp(mut self, host: impl Into<String>, port: u16, secure: bool) -> Self {
        self.outbound = Channel::from_parts(host, port, secure);
        self
    }

    /// Configures the inbound IMAP server.
    ///
    /// An empty host or a zero port leaves inbound disabled.
    #[must_use]
    pub fn imap(mut self, host: impl Into<String>, port: u16, secure: bool) -> Self {
        self.inbound = Channel::from_parts(host, port, secure);
        self
    }

    /// Sets the outbound channel directly.
    #[must_use]
    pub fn outbound(mut self, channel: Channel) -> Self {
        self.outbound = channel;
        self
    }

    /// Sets the inbound channel directly.
    #[must_use]
    pub fn inbound(mut self, channel: Channel) -> Self {
        self.inbound = channel;
        self
    }

    /// Builds the configuration.
    ///
    /// Both channels may be disabled; using a disabled side fails later with
    /// [`Error::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the username or password is missing.
    pub fn build(self) -> Result<AccountConfig> {
        let username = self.username.ok_or_else(|| Error::InvalidConfig {
            message: "username is required".into(),
        })?;

        let password = self.password.ok_or_else(|| Error::InvalidConfig {
            message: "password is required".into(),
        })?;

        Ok(AccountConfig::from_channels(
            self.outbound,
            self.inbound,
            username,
            password,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = AccountConfig::builder()
            .username("user@example.com")
            .password("secret")
            .build()
            .unwrap();

        assert_eq!(config.username(), "user@example.com");
        assert_eq!(config.password(), "secret");
        assert_eq!(config.outbound, Channel::Disabled);
        assert_eq!(config.inbound, Channel::Disabled);
    }

    #[test]
    fn test_builder_full() {
        let config = AccountConfig::builder()
            .username("user@example.com")
            .password("secret")
            .smtp("smtp.ethereal.email", 587, false)
            .imap("imap.ethereal.email", 993, true)
            .build()
            .unwrap();

        assert_eq!(
            config.outbound.endpoint(),
            Some(&ServerEndpoint::new("smtp.ethereal.email", 587, false))
        );
        assert_eq!(
            config.inbound.endpoint().map(ServerEndpoint::address).as_deref(),
            Some("imap.ethereal.email:993")
        );
    }

    #[test]
    fn test_empty_host_or_zero_port_disables_channel() {
        assert_eq!(Channel::from_parts("", 587, false), Channel::Disabled);
        assert_eq!(Channel::from_parts("smtp.example.com", 0, true), Channel::Disabled);
        assert!(Channel::from_parts("smtp.example.com", 25, false).is_enabled());
        assert_eq!(
            Channel::from(ServerEndpoint::new("", 0, false)),
            Channel::Disabled
        );
    }

    #[test]
    fn test_builder_missing_username() {
        let result = AccountConfig::builder().password("secret").build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_builder_missing_password() {
        let result = AccountConfig::builder().username("user").build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_without_outbound() {
        let config = AccountConfig::builder()
            .username("user")
            .password("secret")
            .smtp("smtp.example.com", 465, true)
            .imap("imap.example.com", 993, true)
            .build()
            .unwrap();

        let inbound_only = config.without_outbound();
        assert!(!inbound_only.outbound.is_enabled());
        assert_eq!(inbound_only.inbound, config.inbound);
        assert_eq!(inbound_only.password(), "secret");
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = AccountConfig::builder()
            .username("user@example.com")
            .password("super-secret-password")
            .build()
            .unwrap();

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-password"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(
            ServerEndpoint::new("imap.example.com", 993, true).to_string(),
            "tls://imap.example.com:993"
        );
        assert_eq!(
            ServerEndpoint::new("localhost", 1143, false).to_string(),
            "plain://localhost:1143"
        );
    }
}
