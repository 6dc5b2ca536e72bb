//! Mailgun HTTP API mailer

use super::{EmailMessage, Mailer};
use crate::config::MailConfig;
use crate::error::DispatchError;
use crate::types::DispatchId;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Response body of `POST /v3/{domain}/messages`
#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

/// Mailer sending through the Mailgun messages endpoint
#[derive(Clone)]
pub struct MailgunMailer {
    api_key: String,
    domain: String,
    api_base: String,
}

impl fmt::Debug for MailgunMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunMailer")
            .field("domain", &self.domain)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl MailgunMailer {
    /// Create a mailer from configuration
    pub fn new(config: &MailConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            domain: config.domain.clone(),
            api_base: config.api_base.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/v3/{}/messages",
            self.api_base.trim_end_matches('/'),
            self.domain
        )
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchId, DispatchError> {
        let client = reqwest::Client::new();
        let response = client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", message.from.as_str()),
                ("to", message.to.as_str()),
                ("subject", message.subject.as_str()),
                ("text", message.text.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;

        tracing::debug!(id = %body.id, message = %body.message, "mail API accepted message");

        Ok(DispatchId::new(body.id))
    }

    fn name(&self) -> &'static str {
        "mailgun"
    }
}
