//! LINE channel: webhook payloads and the reply API client.

use crate::channels::inbound::InboundEvent;
use crate::reply::OutboundReply;
use serde::Deserialize;
use std::collections::BTreeMap;

const LINE_API_BASE: &str = "https://api.line.me";

/// Webhook POST body.
#[derive(Debug, Deserialize)]
pub struct LineWebhook {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

/// One webhook event. Only the fields the dispatcher reads are decoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<LineSource>,
    #[serde(default)]
    pub message: Option<LineMessage>,
    #[serde(default)]
    pub postback: Option<LinePostback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LineMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinePostback {
    pub data: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl From<&LineEvent> for InboundEvent {
    fn from(e: &LineEvent) -> Self {
        match e.kind.as_str() {
            "follow" => {
                if let Some(user_id) = e.source.as_ref().and_then(|s| s.user_id.clone()) {
                    return InboundEvent::Follow { user_id };
                }
            }
            "message" => {
                if let Some(ref m) = e.message {
                    if m.kind == "text" {
                        if let Some(ref text) = m.text {
                            return InboundEvent::TextMessage { text: text.clone() };
                        }
                    }
                    return InboundEvent::Other {
                        kind: format!("message/{}", m.kind),
                    };
                }
            }
            "postback" => {
                if let Some(ref p) = e.postback {
                    return InboundEvent::Postback {
                        data: p.data.clone(),
                        params: p.params.clone(),
                    };
                }
            }
            _ => {}
        }
        InboundEvent::Other {
            kind: e.kind.clone(),
        }
    }
}

/// LINE reply client: answers a webhook event through its reply token.
#[derive(Clone)]
pub struct LineChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(token: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        Self {
            id: "line".to_string(),
            token,
            api_base,
            client: reqwest::Client::new(),
        }
    }

    /// Channel id ("line").
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when a channel access token is configured, i.e. replies can actually be sent.
    pub fn can_send(&self) -> bool {
        self.token.is_some()
    }

    /// POST /v2/bot/message/reply
    pub async fn reply(&self, reply_token: &str, messages: &[OutboundReply]) -> Result<(), String> {
        let token = self
            .token
            .as_ref()
            .ok_or("line channel access token not configured")?;
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let body = serde_json::json!({ "replyToken": reply_token, "messages": messages });
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("reply failed: {} {}", status, body));
        }
        Ok(())
    }
}
