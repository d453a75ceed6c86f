//! Communication channels (LINE).
//!
//! Webhook payload types, their classification into [`InboundEvent`], and the reply client
//! the gateway uses to answer them.

mod inbound;
mod line;

pub use inbound::InboundEvent;
pub use line::{LineChannel, LineEvent, LineWebhook};
