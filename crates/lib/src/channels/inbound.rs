//! Inbound event from a channel, already decoded and classified for the dispatcher.

use std::collections::BTreeMap;

/// An event the dispatcher knows how to answer (or deliberately ignore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Follow {
        user_id: String,
    },
    TextMessage {
        text: String,
    },
    Postback {
        data: String,
        params: BTreeMap<String, String>,
    },
    /// Anything else; `kind` is the platform's event type (e.g. "unfollow", "message/image").
    Other {
        kind: String,
    },
}
