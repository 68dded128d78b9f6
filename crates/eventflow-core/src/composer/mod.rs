//! Outgoing message composition.
//!
//! The composer owns validation and send lifecycle for one conversation;
//! delivery itself goes through a [`MessageSender`] supplied by the caller,
//! so the same composer works over REST, the gateway, or a test fake. At
//! most one send is ever in flight: a second send while the first is
//! pending is a no-op, not a queue.

pub mod drafts;

pub use drafts::{ConversationDraft, DraftStore, DraftStoreError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::api::ApiClient;
use crate::config::ComposerLimits;
use crate::error::{CoreError, Result};
use crate::events::{CoreEvent, EventBus, Notice};

/// How long after the last keystroke the typing indicator is retracted.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(3);

/// A file accepted into the composer, held in memory until send.
#[derive(Debug, Clone)]
pub struct StagedAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    /// Hex sha-256 of `data`
    pub checksum: String,
}

/// A file offered to the composer, not yet validated.
#[derive(Debug, Clone)]
pub struct AttachmentCandidate {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Transport-side delivery operation. Implementations own how bytes reach
/// the store; the composer owns everything before that.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        attachments: &[StagedAttachment],
    ) -> Result<()>;
}

#[async_trait]
impl MessageSender for ApiClient {
    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        attachments: &[StagedAttachment],
    ) -> Result<()> {
        self.post_message(conversation_id, content, attachments)
            .await
            .map(|_| ())
    }
}

/// What a call to [`MessageComposer::send`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered; composer state was cleared
    Sent,
    /// Nothing but whitespace staged; no request was made
    NothingToSend,
    /// Another send is still in flight; this call was ignored
    AlreadySending,
}

struct ComposerState {
    text: String,
    attachments: Vec<StagedAttachment>,
    typing_active: bool,
    last_input: Option<Instant>,
}

/// Composer for one conversation.
pub struct MessageComposer {
    conversation_id: String,
    limits: ComposerLimits,
    bus: EventBus,
    state: Mutex<ComposerState>,
    in_flight: AtomicBool,
}

impl MessageComposer {
    pub fn new(conversation_id: impl Into<String>, limits: ComposerLimits, bus: EventBus) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            limits,
            bus,
            state: Mutex::new(ComposerState {
                text: String::new(),
                attachments: Vec::new(),
                typing_active: false,
                last_input: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    pub fn attachment_count(&self) -> usize {
        self.state.lock().attachments.len()
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Replace the draft text, driving the typing indicator. The first
    /// keystroke of a non-empty draft emits a started signal; clearing the
    /// text retracts it immediately.
    pub fn set_text(&self, text: &str) {
        let started;
        let stopped;
        {
            let mut state = self.state.lock();
            state.text = text.to_string();
            if state.text.trim().is_empty() {
                stopped = state.typing_active;
                started = false;
                state.typing_active = false;
                state.last_input = None;
            } else {
                started = !state.typing_active;
                stopped = false;
                state.typing_active = true;
                state.last_input = Some(Instant::now());
            }
        }
        if started {
            self.publish_typing(true);
        }
        if stopped {
            self.publish_typing(false);
        }
    }

    /// Retract the typing indicator once input has been idle past the
    /// timeout. Callers drive this from their own clock tick; `now` is
    /// injected so the cutoff is testable.
    pub fn tick(&self, now: Instant) {
        let expired = {
            let mut state = self.state.lock();
            match (state.typing_active, state.last_input) {
                (true, Some(last)) if now.duration_since(last) >= TYPING_IDLE_TIMEOUT => {
                    state.typing_active = false;
                    state.last_input = None;
                    true
                }
                _ => false,
            }
        };
        if expired {
            self.publish_typing(false);
        }
    }

    /// Stage one file, enforcing the count, size and type limits.
    pub fn attach(&self, candidate: AttachmentCandidate) -> Result<()> {
        let mut state = self.state.lock();
        if state.attachments.len() >= self.limits.max_files {
            return Err(CoreError::Validation(format!(
                "no more than {} files per message",
                self.limits.max_files
            )));
        }
        if candidate.data.len() as u64 > self.limits.max_file_size {
            return Err(CoreError::Validation(format!(
                "{} is larger than the {} MB limit",
                candidate.file_name,
                self.limits.max_file_size / (1024 * 1024)
            )));
        }
        if !self
            .limits
            .allowed_types
            .iter()
            .any(|t| *t == candidate.mime_type)
        {
            return Err(CoreError::Validation(format!(
                "{}: file type {} is not allowed",
                candidate.file_name, candidate.mime_type
            )));
        }
        let checksum = hex::encode(Sha256::digest(&candidate.data));
        state.attachments.push(StagedAttachment {
            file_name: candidate.file_name,
            mime_type: candidate.mime_type,
            data: candidate.data,
            checksum,
        });
        Ok(())
    }

    /// Stage a batch. Each rejection is surfaced as a warning notice and
    /// returned, and the rest of the batch still goes through.
    pub fn attach_many(&self, candidates: Vec<AttachmentCandidate>) -> Vec<CoreError> {
        let mut rejected = Vec::new();
        for candidate in candidates {
            if let Err(err) = self.attach(candidate) {
                self.bus
                    .publish(CoreEvent::Notice(Notice::warning(err.to_string())));
                rejected.push(err);
            }
        }
        rejected
    }

    pub fn remove_attachment(&self, index: usize) -> Option<StagedAttachment> {
        let mut state = self.state.lock();
        if index < state.attachments.len() {
            Some(state.attachments.remove(index))
        } else {
            None
        }
    }

    /// Deliver the staged message through `sender`.
    ///
    /// On success the composer is cleared; on failure the text and
    /// attachments stay exactly as they were, ready for a retry. While a
    /// send is pending, further calls return [`SendOutcome::AlreadySending`]
    /// without touching anything.
    pub async fn send(&self, sender: &dyn MessageSender) -> Result<SendOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(conversation_id = %self.conversation_id, "send already in flight");
            return Ok(SendOutcome::AlreadySending);
        }

        let (content, attachments) = {
            let state = self.state.lock();
            (state.text.trim().to_string(), state.attachments.clone())
        };
        if content.is_empty() && attachments.is_empty() {
            self.in_flight.store(false, Ordering::SeqCst);
            return Ok(SendOutcome::NothingToSend);
        }

        // The indicator must never outlive the message it announced.
        self.retract_typing();

        let result = sender
            .send_message(&self.conversation_id, &content, &attachments)
            .await;
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                {
                    let mut state = self.state.lock();
                    state.text.clear();
                    state.attachments.clear();
                }
                self.bus.publish(CoreEvent::MessageSent {
                    conversation_id: self.conversation_id.clone(),
                });
                self.bus
                    .publish(CoreEvent::Notice(Notice::success("Message sent")));
                Ok(SendOutcome::Sent)
            }
            Err(err) => {
                self.bus.publish(CoreEvent::Notice(Notice::error(format!(
                    "Failed to send message: {err}"
                ))));
                Err(err)
            }
        }
    }

    /// Snapshot the composer as a persistable draft.
    pub fn to_draft(&self) -> ConversationDraft {
        let state = self.state.lock();
        ConversationDraft::new(
            self.conversation_id.clone(),
            state.text.clone(),
            state
                .attachments
                .iter()
                .map(|a| a.file_name.clone())
                .collect(),
        )
    }

    /// Restore persisted draft text. Attachments are names only in a draft,
    /// so they are not restored; the caller re-stages files if needed.
    pub fn restore(&self, draft: &ConversationDraft) {
        let mut state = self.state.lock();
        state.text = draft.text.clone();
    }

    fn retract_typing(&self) {
        let was_active = {
            let mut state = self.state.lock();
            let was = state.typing_active;
            state.typing_active = false;
            state.last_input = None;
            was
        };
        if was_active {
            self.publish_typing(false);
        }
    }

    fn publish_typing(&self, started: bool) {
        self.bus.publish(CoreEvent::Typing {
            conversation_id: self.conversation_id.clone(),
            started,
        });
    }
}
