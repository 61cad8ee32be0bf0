//! LINE webhook payload.
//!
//! Only the fields needed to answer text messages are modelled; everything
//! else in the payload is ignored by serde.

use serde::Deserialize;

use super::LineError;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "replyToken")]
    pub reply_token: Option<String>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

/// A text message that can be replied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMessage<'a> {
    pub reply_token: &'a str,
    pub text: &'a str,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self, LineError> {
        serde_json::from_slice(body).map_err(|e| LineError::Payload(e.to_string()))
    }

    /// Text message events carrying a reply token, in payload order.
    pub fn text_messages(&self) -> impl Iterator<Item = TextMessage<'_>> {
        self.events.iter().filter_map(|event| {
            if event.kind != "message" {
                return None;
            }
            let message = event.message.as_ref().filter(|m| m.kind == "text")?;
            Some(TextMessage {
                reply_token: event.reply_token.as_deref()?,
                text: message.text.as_deref()?,
            })
        })
    }
}
