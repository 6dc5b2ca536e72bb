//! Outcome notification by email
//!
//! [`NotificationDispatcher`] picks one of the two fixed templates for the
//! run outcome, hands the message to a [`Mailer`], and abandons the send if it
//! has not finished within the configured bound. A failed or abandoned send
//! yields an empty [`DispatchId`].

use crate::config::MailConfig;
use crate::error::DispatchError;
use crate::types::{DispatchId, PipelineOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

mod mailgun;
pub mod templates;

pub use mailgun::MailgunMailer;

/// A composed notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
}

impl EmailMessage {
    /// Compose the notification for `outcome`
    pub fn compose(
        from: &str,
        recipient: &str,
        outcome: PipelineOutcome,
        submission_url: &str,
        assignment_name: &str,
    ) -> Self {
        Self {
            from: from.to_string(),
            to: recipient.to_string(),
            subject: templates::subject(outcome, assignment_name),
            text: templates::body(outcome, recipient, submission_url, assignment_name),
        }
    }
}

/// Trait for outbound email backends
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message and return the backend's id for it
    async fn send(&self, message: &EmailMessage) -> Result<DispatchId, DispatchError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Result of one dispatch attempt
#[must_use]
#[derive(Debug)]
pub struct Dispatched {
    /// Backend id (empty when the send failed)
    pub id: DispatchId,
    /// Why the send failed
    pub failure: Option<DispatchError>,
}

impl Dispatched {
    /// Whether the backend accepted the message
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Sends exactly one outcome email per call
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    sender: String,
    timeout: Duration,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("mailer", &self.mailer.name())
            .field("sender", &self.sender)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher around `mailer`
    pub fn new(mailer: Arc<dyn Mailer>, sender: impl Into<String>, timeout: Duration) -> Self {
        Self {
            mailer,
            sender: sender.into(),
            timeout,
        }
    }

    /// Create a dispatcher using the Mailgun backend described by `config`
    pub fn from_config(config: &MailConfig) -> Self {
        Self::new(
            Arc::new(MailgunMailer::new(config)),
            config.sender_address(),
            config.timeout,
        )
    }

    /// Upper bound for one send
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Compose and send the notification for `outcome`
    pub async fn send(
        &self,
        recipient: &str,
        outcome: PipelineOutcome,
        submission_url: &str,
        assignment_name: &str,
    ) -> Dispatched {
        let message = EmailMessage::compose(
            &self.sender,
            recipient,
            outcome,
            submission_url,
            assignment_name,
        );

        let result = match tokio::time::timeout(self.timeout, self.mailer.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::TimedOut {
                after: self.timeout,
            }),
        };

        match result {
            Ok(id) => {
                tracing::debug!(
                    recipient = %recipient,
                    mailer = self.mailer.name(),
                    id = %id,
                    "notification sent"
                );
                Dispatched { id, failure: None }
            }
            Err(e) => Dispatched {
                id: DispatchId::default(),
                failure: Some(e),
            },
        }
    }
}
