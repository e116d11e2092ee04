//! Disposable test mailboxes.
//!
//! [`EtherealProvisioner`] asks the Ethereal test-account API for a fresh
//! mailbox. Implement [`AccountProvisioner`] to use another service.

use crate::config::{AccountConfig, Channel, ServerEndpoint};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Default account creation endpoint.
pub const ETHEREAL_API_URL: &str = "https://api.nodemailer.com/user";

/// Connection parameters of a provisioned mailbox.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ProvisionedAccount {
    /// Login name, also the mailbox address.
    #[serde(rename = "user")]
    pub username: String,
    /// Login password.
    #[serde(rename = "pass")]
    pub password: String,
    /// Outbound server.
    pub smtp: ServerEndpoint,
    /// Inbound server.
    pub imap: ServerEndpoint,
}

impl ProvisionedAccount {
    /// Converts the account into a configuration with both channels enabled.
    #[must_use]
    pub fn into_config(self) -> AccountConfig {
        AccountConfig::from_channels(
            Channel::from(self.smtp),
            Channel::from(self.imap),
            self.username,
            self.password,
        )
    }
}

impl std::fmt::Debug for ProvisionedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionedAccount")
            .field("username", &self.username)
            .field("smtp", &self.smtp)
            .field("imap", &self.imap)
            .finish_non_exhaustive()
    }
}

/// Source of disposable mailboxes.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Creates a new mailbox and returns its connection parameters.
    async fn provision(&self) -> Result<ProvisionedAccount>;
}

/// Client for the Ethereal test-account API.
#[derive(Debug, Clone)]
pub struct EtherealProvisioner {
    client: reqwest::Client,
    api_url: String,
    requestor: String,
}

#[derive(Serialize)]
struct AccountRequest<'a> {
    requestor: &'a str,
    version: &'a str,
}

#[derive(Deserialize)]
struct AccountResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    account: Option<ProvisionedAccount>,
}

impl Default for EtherealProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl EtherealProvisioner {
    /// Creates a provisioner for [`ETHEREAL_API_URL`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: ETHEREAL_API_URL.to_string(),
            requestor: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// Uses another API endpoint.
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the requestor name reported to the API.
    #[must_use]
    pub fn requestor(mut self, requestor: impl Into<String>) -> Self {
        self.requestor = requestor.into();
        self
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl AccountProvisioner for EtherealProvisioner {
    #[instrument(name = "EtherealProvisioner::provision", skip_all, fields(api_url = %self.api_url))]
    async fn provision(&self) -> Result<ProvisionedAccount> {
        let request = AccountRequest {
            requestor: &self.requestor,
            version: env!("CARGO_PKG_VERSION"),
        };

        let response: AccountResponse = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| Error::ProvisionRequest { source })?
            .json()
            .await
            .map_err(|source| Error::ProvisionRequest { source })?;

        let account = response.into_account()?;

        debug!(username = %account.username, "Provisioned test account");

        Ok(account)
    }
}

impl AccountResponse {
    fn into_account(self) -> Result<ProvisionedAccount> {
        if self.status != "success" {
            return Err(Error::ProvisionRejected {
                message: self.error.unwrap_or(self.status),
            });
        }

        self.account.ok_or_else(|| Error::ProvisionRejected {
            message: "response is missing account details".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{
        "status": "success",
        "user": "abc@ethereal.email",
        "pass": "s3cret",
        "smtp": { "host": "smtp.ethereal.email", "port": 587, "secure": false },
        "imap": { "host": "imap.ethereal.email", "port": 993, "secure": true },
        "pop3": { "host": "pop3.ethereal.email", "port": 995, "secure": true },
        "web": "https://ethereal.email"
    }"#;

    #[test]
    fn test_success_response() {
        let response: AccountResponse = serde_json::from_str(SUCCESS).unwrap();
        let account = response.into_account().unwrap();

        assert_eq!(account.username, "abc@ethereal.email");
        assert_eq!(account.smtp, ServerEndpoint::new("smtp.ethereal.email", 587, false));
        assert_eq!(account.imap, ServerEndpoint::new("imap.ethereal.email", 993, true));
        assert!(!format!("{account:?}").contains("s3cret"));
    }

    #[test]
    fn test_error_response() {
        let response: AccountResponse =
            serde_json::from_str(r#"{ "status": "error", "error": "rate limited" }"#).unwrap();

        let err = response.into_account().unwrap_err();
        assert!(matches!(err, Error::ProvisionRejected { ref message } if message == "rate limited"));
    }

    #[test]
    fn test_success_without_details() {
        let response: AccountResponse =
            serde_json::from_str(r#"{ "status": "success" }"#).unwrap();

        assert!(matches!(
            response.into_account(),
            Err(Error::ProvisionRejected { .. })
        ));
    }

    #[test]
    fn test_into_config_enables_both_channels() {
        let response: AccountResponse = serde_json::from_str(SUCCESS).unwrap();
        let config = response.into_account().unwrap().into_config();

        assert_eq!(config.username(), "abc@ethereal.email");
        assert_eq!(config.password(), "s3cret");
        assert_eq!(
            config.outbound.endpoint().map(ToString::to_string).as_deref(),
            Some("plain://smtp.ethereal.email:587")
        );
        assert!(config.inbound.is_enabled());
    }

    #[test]
    fn test_builder_overrides() {
        let provisioner = EtherealProvisioner::new()
            .api_url("http://localhost:8080/user")
            .requestor("tests");

        assert_eq!(provisioner.api_url, "http://localhost:8080/user");
        assert_eq!(provisioner.requestor, "tests");
    }
}
