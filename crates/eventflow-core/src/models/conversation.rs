use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of conversation types. Every producer and consumer in the
/// system shares this one definition; wire strings outside the set fail
/// deserialization at the boundary instead of leaking into application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    /// One-to-one conversation between two users.
    Direct,
    /// Started from a marketplace listing.
    Marketplace,
    /// Started from a package enquiry.
    Enquiry,
    /// Customer support thread backing an admin ticket.
    Support,
    /// Supplier-to-supplier networking.
    SupplierNetwork,
}

impl ConversationType {
    /// All valid types, in wire order.
    pub const ALL: [ConversationType; 5] = [
        ConversationType::Direct,
        ConversationType::Marketplace,
        ConversationType::Enquiry,
        ConversationType::Support,
        ConversationType::SupplierNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Marketplace => "marketplace",
            ConversationType::Enquiry => "enquiry",
            ConversationType::Support => "support",
            ConversationType::SupplierNetwork => "supplier_network",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

/// Role a participant holds within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Customer,
    Supplier,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub role: ParticipantRole,
}

/// Reference to the entity the conversation was started from (a listing, a
/// package enquiry). Display metadata only; never consulted for access
/// decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub reference_id: String,
    pub title: String,
}

/// A thread of messages between two or more participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation id assigned by the store
    pub id: String,
    /// What kind of thread this is
    #[serde(rename = "type")]
    pub kind: ConversationType,
    /// Everyone with access to the thread
    pub participants: Vec<Participant>,
    /// Originating listing or enquiry, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ConversationContext>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent message, if any
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Check if a user participates in this conversation
    pub fn involves(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// True when this is the direct conversation for the given pair of
    /// users, in either order. Direct threads are unique per pair, so this
    /// is the lookup used before creating a new one.
    pub fn is_direct_between(&self, a: &str, b: &str) -> bool {
        if self.kind != ConversationType::Direct || self.participants.len() != 2 {
            return false;
        }
        let pair = Self::normalized_pair(
            self.participants[0].user_id.as_str(),
            self.participants[1].user_id.as_str(),
        );
        pair == Self::normalized_pair(a, b)
    }

    /// Normalize a pair of user ids so the same two users always produce
    /// the same key regardless of argument order.
    pub fn normalized_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
