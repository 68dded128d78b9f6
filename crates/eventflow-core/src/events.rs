use tokio::sync::broadcast;

use crate::models::{Conversation, SupportTicket};

/// Severity of a transient user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, non-blocking notification for the user. Notices surface
/// outcomes (send failed, attachment rejected) without interrupting flow.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Events fanned out to every interested component in this process. This is
/// the in-process counterpart of the gateway push channel: a component that
/// already knows a new fact publishes it here so same-process listeners do
/// not wait for a network round trip.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// The aggregate unread count changed; value is absolute, not a delta
    UnreadCountUpdated { count: i64 },
    /// The composer delivered a message
    MessageSent { conversation_id: String },
    /// A conversation was opened or created via the contact picker
    ConversationActivated(Conversation),
    /// A ticket's status, priority or assignment changed
    TicketUpdated(SupportTicket),
    /// The local user started or stopped typing in a conversation
    Typing {
        conversation_id: String,
        started: bool,
    },
    /// Transient user-facing notification
    Notice(Notice),
}

/// Broadcast fan-out for [`CoreEvent`]. Cheap to clone; every subscriber
/// gets every event published after it subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is normal, not an error.
    pub fn publish(&self, event: CoreEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
