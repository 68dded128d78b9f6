use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a file attached to a message. The bytes themselves live in
/// the store; clients only carry the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// Hex sha-256 of the content, recorded when the file was staged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// A single message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// User who authored the message
    pub from_user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    /// Drafts are visible only to their author and never delivered
    #[serde(default)]
    pub is_draft: bool,
    /// Set once the author has edited the message at least once
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    /// Tombstone flag; deleted messages keep their slot but drop content
    #[serde(default)]
    pub deleted: bool,
}

impl Message {
    /// Messages that count toward delivery and unread totals. Drafts and
    /// tombstones are excluded.
    pub fn is_deliverable(&self) -> bool {
        !self.is_draft && !self.deleted
    }

    /// Short single-line preview for list rendering
    pub fn preview(&self) -> String {
        if self.deleted {
            return "[deleted]".to_string();
        }
        let first_line = self.content.lines().next().unwrap_or("");
        if first_line.chars().count() > 50 {
            let truncated: String = first_line.chars().take(50).collect();
            format!("{}...", truncated)
        } else {
            first_line.to_string()
        }
    }
}
