//! Request and response bodies for the EventFlow REST API.

use serde::{Deserialize, Serialize};

use crate::models::{
    Contact, Conversation, ConversationContext, ConversationType, Message, SupportTicket,
    TicketPriority, TicketStatus,
};

/// Aggregate unread count. Older API deployments used `unreadCount`; both
/// spellings decode into the same field.
#[derive(Debug, Deserialize)]
pub struct UnreadCountResponse {
    #[serde(alias = "unreadCount")]
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct CreateConversationRequest {
    #[serde(rename = "type")]
    pub kind: ConversationType,
    pub participant_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ConversationContext>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
}

/// One file in a send request. Content travels base64-encoded alongside the
/// metadata the store needs to verify and serve it.
#[derive(Debug, Serialize)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    /// Hex sha-256 of the raw bytes
    pub checksum: String,
    /// Base64-encoded content
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentUpload>,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct EditMessageRequest {
    pub content: String,
}

/// Returned by mark-read so the caller can propagate the new aggregate
/// without a second request.
#[derive(Debug, Deserialize)]
pub struct MarkReadResponse {
    #[serde(alias = "unreadCount")]
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct TicketsResponse {
    pub tickets: Vec<SupportTicket>,
}

#[derive(Debug, Deserialize)]
pub struct TicketResponse {
    pub ticket: SupportTicket,
}

#[derive(Debug, Serialize)]
pub struct TicketReplyRequest {
    pub message: String,
}

/// Partial ticket update. `assigned_to` is doubly optional: omitted leaves
/// assignment untouched, `null` clears it, a value assigns.
#[derive(Debug, Default, Serialize)]
pub struct TicketUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<String>>,
}
