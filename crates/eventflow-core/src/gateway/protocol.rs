//! Wire protocol for the push gateway.
//!
//! Every frame is a JSON envelope tagged by `type`. Decoding is strict:
//! unknown event names, missing payload fields and wrong payload types all
//! fail decode, so malformed frames are dropped at the boundary and
//! downstream code only ever sees well-formed variants.

use serde::{Deserialize, Serialize};

use crate::models::{Conversation, Message, SupportTicket};

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    /// Subscription acknowledged; push delivery is live from here on
    #[serde(rename = "ready")]
    Ready,
    /// Absolute aggregate unread count for the subscribed user
    #[serde(rename = "unread:update")]
    UnreadUpdate { count: i64 },
    #[serde(rename = "message:new")]
    MessageNew { message: Message },
    #[serde(rename = "conversation:new")]
    ConversationNew { conversation: Conversation },
    #[serde(rename = "ticket:update")]
    TicketUpdate { ticket: SupportTicket },
    /// A remote participant started or stopped typing
    #[serde(rename = "typing")]
    Typing {
        conversation_id: String,
        user_id: String,
        started: bool,
    },
    #[serde(rename = "pong")]
    Pong,
}

impl GatewayEvent {
    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::Ready => "ready",
            GatewayEvent::UnreadUpdate { .. } => "unread:update",
            GatewayEvent::MessageNew { .. } => "message:new",
            GatewayEvent::ConversationNew { .. } => "conversation:new",
            GatewayEvent::TicketUpdate { .. } => "ticket:update",
            GatewayEvent::Typing { .. } => "typing",
            GatewayEvent::Pong => "pong",
        }
    }
}

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Sent once per connection, immediately after connect
    #[serde(rename = "subscribe")]
    Subscribe { user_id: String },
    #[serde(rename = "typing")]
    Typing {
        conversation_id: String,
        started: bool,
    },
    #[serde(rename = "ping")]
    Ping,
}

pub fn decode_event(text: &str) -> Result<GatewayEvent, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn encode_frame(frame: &ClientFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}
