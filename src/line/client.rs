//! LINE Messaging API reply client.

use serde::Serialize;
use std::time::Duration;

use super::LineError;

/// Delivers a text reply for a webhook event.
pub trait ReplySender: Send + Sync {
    fn reply(&self, reply_token: &str, text: &str) -> Result<(), LineError>;
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    #[serde(rename = "replyToken")]
    reply_token: &'a str,
    messages: [ReplyMessage<'a>; 1],
}

#[derive(Serialize)]
struct ReplyMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Blocking client for `POST /v2/bot/message/reply`.
///
/// Must be constructed and used outside async contexts (the web layer calls
/// it from `spawn_blocking`).
pub struct LineMessagingClient {
    http: reqwest::blocking::Client,
    reply_url: String,
    access_token: String,
}

impl LineMessagingClient {
    pub fn new(api_base: &str, access_token: &str) -> Result<Self, LineError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LineError::Request(e.to_string()))?;
        Ok(Self {
            http,
            reply_url: reply_url(api_base),
            access_token: access_token.to_string(),
        })
    }
}

fn reply_url(api_base: &str) -> String {
    format!("{}/v2/bot/message/reply", api_base.trim_end_matches('/'))
}

impl ReplySender for LineMessagingClient {
    fn reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        let request = ReplyRequest {
            reply_token,
            messages: [ReplyMessage { kind: "text", text }],
        };

        let response = self
            .http
            .post(&self.reply_url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .map_err(|e| LineError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LineError::Http(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_url_joins_base_without_double_slash() {
        assert_eq!(
            reply_url("https://api.line.me/"),
            "https://api.line.me/v2/bot/message/reply"
        );
        assert_eq!(
            reply_url("http://127.0.0.1:9000"),
            "http://127.0.0.1:9000/v2/bot/message/reply"
        );
    }

    #[test]
    fn test_reply_request_serializes_to_line_shape() {
        let request = ReplyRequest {
            reply_token: "abc",
            messages: [ReplyMessage {
                kind: "text",
                text: "hi",
            }],
        };
        let json = serde_json::to_value(&request).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({
                "replyToken": "abc",
                "messages": [{"type": "text", "text": "hi"}]
            })
        );
    }
}
