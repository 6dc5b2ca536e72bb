//! Trigger payload decoding
//!
//! Two envelope shapes are accepted:
//!
//! - the SNS event batch handed to serverless handlers,
//!   `{"Records":[{"Sns":{"Message":"<json>", ...}}, ...]}`
//! - a single SNS HTTP(S) delivery, `{"Type":"Notification","Message":"<json>", ...}`
//!
//! The `Message` string of each record is itself JSON describing one
//! submission. Envelope problems reject the whole payload. Inside a batch, a
//! record of the wrong SNS type or with a bad message only rejects itself.

use crate::error::DecodeError;
use crate::types::SubmissionEvent;
use serde::Deserialize;

/// One record pulled out of a notification envelope, not yet decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMessage {
    /// Position inside the batch (0 for single deliveries)
    pub index: usize,
    /// SNS message id, when the envelope carries one
    pub message_id: Option<String>,
    /// Raw message body
    pub body: String,
    /// SNS message type, when the record carries one
    pub kind: Option<String>,
}

impl TriggerMessage {
    /// Decode the message body into a submission
    pub fn decode(&self) -> Result<SubmissionEvent, DecodeError> {
        if let Some(kind) = self.kind.as_deref().filter(|kind| *kind != NOTIFICATION) {
            return Err(DecodeError::UnsupportedType(kind.to_string()));
        }
        serde_json::from_str(&self.body).map_err(|e| DecodeError::InvalidMessage {
            index: self.index,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SnsEvent {
    #[serde(rename = "Records")]
    records: Vec<SnsEventRecord>,
}

#[derive(Debug, Deserialize)]
struct SnsEventRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsMessage {
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    message: String,
}

const NOTIFICATION: &str = "Notification";

/// Split a notification envelope into its records
///
/// Every record of a batch is returned, in envelope order; a record whose
/// type is not `Notification` fails later in [`TriggerMessage::decode`]. A
/// single HTTP delivery of another type (such as `SubscriptionConfirmation`)
/// has nothing else to run and rejects the payload with
/// [`DecodeError::UnsupportedType`].
pub fn decode_envelope(payload: &[u8]) -> Result<Vec<TriggerMessage>, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|e| DecodeError::InvalidEnvelope(e.to_string()))?;

    let messages = if value.get("Records").is_some() {
        let event: SnsEvent = serde_json::from_value(value)
            .map_err(|e| DecodeError::InvalidEnvelope(e.to_string()))?;
        event.records.into_iter().map(|record| record.sns).collect()
    } else {
        let message: SnsMessage = serde_json::from_value(value)
            .map_err(|e| DecodeError::InvalidEnvelope(e.to_string()))?;
        if let Some(kind) = message.kind.as_deref().filter(|kind| *kind != NOTIFICATION) {
            return Err(DecodeError::UnsupportedType(kind.to_string()));
        }
        vec![message]
    };

    if messages.is_empty() {
        return Err(DecodeError::EmptyBatch);
    }

    Ok(messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| TriggerMessage {
            index,
            message_id: message.message_id,
            body: message.message,
            kind: message.kind,
        })
        .collect())
}
