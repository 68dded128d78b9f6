pub mod contact;
pub mod conversation;
pub mod message;
pub mod ticket;

pub use contact::Contact;
pub use conversation::{
    Conversation, ConversationContext, ConversationType, Participant, ParticipantRole,
};
pub use message::{AttachmentRef, Message};
pub use ticket::{
    sort_for_triage, AssignmentFilter, SupportTicket, TicketFilters, TicketPriority, TicketStatus,
};
