//! Outbound notifications through mail-relay webhooks.
//!
//! Delivery is delegated to two HTTP endpoints that accept a small JSON body
//! and send the actual email: one for verification codes, one for password
//! reset links.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("webhook returned {0}")]
    Status(u16),

    /// No webhook is configured for this notification.
    #[error("{0} webhook is not configured")]
    NotConfigured(&'static str),
}

#[derive(Serialize)]
struct OtpPayload<'a> {
    otp: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPayload<'a> {
    url: &'a str,
    email: &'a str,
}

/// Webhook endpoints for [`Notifier`].
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub otp_webhook: Option<Url>,
    pub reset_webhook: Option<Url>,
    /// Page the reset link points at. The email is appended as `?email=`.
    pub reset_page: Url,
}

/// Webhook notification client.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

impl Notifier {
    /// Create a notifier.
    #[must_use]
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Send a verification code to `email`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::NotConfigured` without an OTP webhook, or an
    /// HTTP/status error if delivery fails.
    #[instrument(skip(self, otp))]
    pub async fn send_verification_code(&self, email: &str, otp: &str) -> Result<(), NotifyError> {
        let url = self
            .config
            .otp_webhook
            .as_ref()
            .ok_or(NotifyError::NotConfigured("verification"))?;

        self.post(url, &OtpPayload { otp, email }).await
    }

    /// Send a password reset link to `email`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::NotConfigured` without a reset webhook, or an
    /// HTTP/status error if delivery fails.
    #[instrument(skip(self))]
    pub async fn send_password_reset(&self, email: &str) -> Result<(), NotifyError> {
        let url = self
            .config
            .reset_webhook
            .as_ref()
            .ok_or(NotifyError::NotConfigured("password reset"))?;

        let link = self.reset_link(email);
        self.post(url, &ResetPayload { url: link.as_str(), email }).await
    }

    /// Link to the reset page for `email`.
    #[must_use]
    pub fn reset_link(&self, email: &str) -> Url {
        let mut link = self.config.reset_page.clone();
        link.query_pairs_mut().clear().append_pair("email", email);
        link
    }

    async fn post<T: Serialize + Sync>(&self, url: &Url, body: &T) -> Result<(), NotifyError> {
        let response = self.client.post(url.clone()).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        debug!("Notification delivered");
        Ok(())
    }
}
