/// LINE chat-bot integration.
///
/// Submodules:
/// - `signature`: `X-Line-Signature` verification.
/// - `webhook`: webhook payload types.
/// - `chat`: the status command handler.
/// - `client`: reply delivery through the Messaging API.

pub mod chat;
pub mod client;
pub mod signature;
pub mod webhook;

use std::fmt;
use std::sync::Arc;

use crate::logging::{self, Component};
use crate::model::Report;

pub use chat::ChatCommandHandler;
pub use client::{LineMessagingClient, ReplySender};
pub use signature::{SignatureError, verify_signature};
pub use webhook::WebhookPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The webhook body is not a valid LINE payload.
    Payload(String),
    /// The Messaging API answered with a non-2xx status.
    Http(u16),
    /// The reply request could not be sent.
    Request(String),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Payload(msg) => write!(f, "Invalid webhook payload: {}", msg),
            LineError::Http(code) => write!(f, "LINE API HTTP error: {}", code),
            LineError::Request(msg) => write!(f, "LINE API request failed: {}", msg),
        }
    }
}

impl std::error::Error for LineError {}

/// A configured bot: channel secret, command handler and reply channel.
pub struct LineBot {
    channel_secret: String,
    handler: ChatCommandHandler,
    sender: Arc<dyn ReplySender>,
}

impl LineBot {
    pub fn new(channel_secret: &str, handler: ChatCommandHandler, sender: Arc<dyn ReplySender>) -> Self {
        LineBot {
            channel_secret: channel_secret.to_string(),
            handler,
            sender,
        }
    }

    /// Checks the `X-Line-Signature` header value, if one was sent.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let signature = signature.ok_or(SignatureError::Missing)?;
        verify_signature(&self.channel_secret, body, signature)
    }

    /// Answers every text message in `payload`. Reports are loaded at most
    /// once per payload, and only if a message is a command. Returns the
    /// number of replies delivered; delivery failures are logged.
    pub fn dispatch<F>(&self, payload: &WebhookPayload, load_reports: F) -> usize
    where
        F: Fn() -> Vec<Report>,
    {
        let mut cached: Option<Vec<Report>> = None;
        let mut delivered = 0;

        for message in payload.text_messages() {
            logging::info(
                Component::Line,
                None,
                &format!("Received LINE message: {}", message.text),
            );

            let reply = self.handler.handle(message.text, || {
                cached.get_or_insert_with(&load_reports).clone()
            });
            let Some(reply) = reply else {
                continue;
            };

            match self.sender.reply(message.reply_token, &reply) {
                Ok(()) => delivered += 1,
                Err(e) => logging::error(Component::Line, None, &format!("Reply failed: {}", e)),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::CategoryTable;
    use crate::config::DEFAULT_STATUS_COMMAND;
    use std::cell::Cell;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl ReplySender for RecordingSender {
        fn reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
            if self.fail {
                return Err(LineError::Http(500));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((reply_token.to_string(), text.to_string()));
            }
            Ok(())
        }
    }

    fn bot(sender: Arc<RecordingSender>) -> LineBot {
        let handler = ChatCommandHandler::new(DEFAULT_STATUS_COMMAND, 3, CategoryTable::default());
        LineBot::new("secret", handler, sender)
    }

    fn payload(texts: &[&str]) -> WebhookPayload {
        let events: Vec<serde_json::Value> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                serde_json::json!({
                    "type": "message",
                    "replyToken": format!("token-{}", i),
                    "message": {"type": "text", "text": text}
                })
            })
            .collect();
        let body = serde_json::json!({ "events": events }).to_string();
        WebhookPayload::parse(body.as_bytes()).expect("valid payload")
    }

    #[test]
    fn test_dispatch_replies_only_to_commands() {
        let sender = Arc::new(RecordingSender::default());
        let bot = bot(sender.clone());
        let delivered = bot.dispatch(&payload(&["hi", DEFAULT_STATUS_COMMAND]), Vec::new);
        assert_eq!(delivered, 1);
        let sent = sender.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "token-1");
        assert_eq!(sent[0].1, chat::REPLY_NOT_FLOODED);
    }

    #[test]
    fn test_dispatch_loads_reports_once_per_payload() {
        let sender = Arc::new(RecordingSender::default());
        let loads = Cell::new(0);
        let delivered = bot(sender).dispatch(
            &payload(&[DEFAULT_STATUS_COMMAND, DEFAULT_STATUS_COMMAND]),
            || {
                loads.set(loads.get() + 1);
                Vec::new()
            },
        );
        assert_eq!(delivered, 2);
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_dispatch_survives_reply_failure() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let delivered = bot(sender).dispatch(&payload(&[DEFAULT_STATUS_COMMAND]), Vec::new);
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_verify_uses_channel_secret() {
        let bot = bot(Arc::new(RecordingSender::default()));
        let signature = signature::sign("secret", b"{}").expect("sign");
        assert!(bot.verify(b"{}", Some(signature.as_str())).is_ok());
        assert_eq!(bot.verify(b"{}", Some("AAAA")), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_verify_without_header_is_missing() {
        let bot = bot(Arc::new(RecordingSender::default()));
        assert_eq!(bot.verify(b"{}", None), Err(SignatureError::Missing));
    }
}
