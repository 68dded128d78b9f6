//! Contact search and direct-conversation resolution.
//!
//! Keystrokes land in [`ContactPicker::set_query`]; a search only reaches
//! the directory once input has been quiet for the debounce window, and
//! results apply strictly in issue order. A response from a superseded
//! query can park on a slow network as long as it likes; it will never
//! overwrite what a newer query rendered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiClient, CreateConversationRequest};
use crate::error::{CoreError, Result};
use crate::events::{CoreEvent, EventBus, Notice};
use crate::models::{Contact, Conversation, ConversationType};

/// Quiet period after the last keystroke before a search fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this are never sent.
pub const MIN_QUERY_LEN: usize = 2;

/// Directory and conversation operations the picker needs. The REST client
/// is the production implementation; tests supply in-memory fakes.
#[async_trait]
pub trait ConversationDirectory: Send + Sync {
    /// Search contacts. An empty query returns the unfiltered listing.
    async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>>;
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;
    async fn create_conversation(&self, request: &CreateConversationRequest)
        -> Result<Conversation>;
}

#[async_trait]
impl ConversationDirectory for ApiClient {
    async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>> {
        ApiClient::search_contacts(self, query).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        ApiClient::list_conversations(self).await
    }

    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> Result<Conversation> {
        ApiClient::create_conversation(self, request).await
    }
}

/// What the picker currently shows. A failed search leaves an error in
/// place of results so the UI can offer a retry.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub query: String,
    pub contacts: Vec<Contact>,
    pub error: Option<String>,
}

pub struct ContactPicker {
    directory: Arc<dyn ConversationDirectory>,
    user_id: String,
    bus: EventBus,
    debounce: Duration,
    results: Arc<Mutex<SearchResults>>,
    /// Monotonic issue number; one per keystroke
    issued: Arc<AtomicU64>,
    /// Highest issue number whose results have been applied
    applied: Arc<AtomicU64>,
    /// Debounce task for the newest keystroke, if it has not fired yet
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ContactPicker {
    pub fn new(
        directory: Arc<dyn ConversationDirectory>,
        user_id: impl Into<String>,
        bus: EventBus,
    ) -> Self {
        Self {
            directory,
            user_id: user_id.into(),
            bus,
            debounce: SEARCH_DEBOUNCE,
            results: Arc::new(Mutex::new(SearchResults::default())),
            issued: Arc::new(AtomicU64::new(0)),
            applied: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Record a keystroke. Supersedes any search still waiting out its
    /// debounce; too-short queries invalidate in-flight work but fire
    /// nothing themselves. Must be called from within a tokio runtime.
    pub fn set_query(&self, query: &str) {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        // A timer that has not fired yet belongs to a superseded keystroke.
        if let Some(timer) = self.pending.lock().take() {
            timer.abort();
        }

        let trimmed = query.trim().to_string();
        if !trimmed.is_empty() && trimmed.chars().count() < MIN_QUERY_LEN {
            debug!(query = %trimmed, "query below minimum length, not searching");
            return;
        }

        let directory = Arc::clone(&self.directory);
        let results = Arc::clone(&self.results);
        let issued = Arc::clone(&self.issued);
        let applied = Arc::clone(&self.applied);
        let pending = Arc::clone(&self.pending);
        let debounce = self.debounce;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Past the debounce this task is committed; it is no longer
            // cancellable as a pending timer.
            pending.lock().take();
            if issued.load(Ordering::SeqCst) != seq {
                return;
            }
            let outcome = directory
                .search_contacts(&trimmed)
                .await
                .map_err(|e| e.to_string());
            Self::apply(&results, &issued, &applied, seq, trimmed, outcome);
        });
        *self.pending.lock() = Some(timer);
    }

    /// One-shot search that skips the debounce, for non-interactive
    /// callers. Still invalidates any in-flight keystroke search.
    pub async fn search_now(&self, query: &str) -> Result<Vec<Contact>> {
        let trimmed = query.trim();
        if !trimmed.is_empty() && trimmed.chars().count() < MIN_QUERY_LEN {
            return Err(CoreError::Validation(format!(
                "search needs at least {MIN_QUERY_LEN} characters"
            )));
        }
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(timer) = self.pending.lock().take() {
            timer.abort();
        }
        let outcome = self.directory.search_contacts(trimmed).await;
        let snapshot = match &outcome {
            Ok(contacts) => Ok(contacts.clone()),
            Err(err) => Err(err.to_string()),
        };
        Self::apply(
            &self.results,
            &self.issued,
            &self.applied,
            seq,
            trimmed.to_string(),
            snapshot,
        );
        outcome
    }

    /// The contacts (or error) for the newest applied search.
    pub fn results(&self) -> SearchResults {
        self.results.lock().clone()
    }

    /// Open the direct conversation with a contact, creating it only when
    /// the pair has never talked. Exactly one direct thread exists per
    /// pair, so selecting the same contact twice lands in the same place.
    pub async fn select_contact(&self, contact: &Contact) -> Result<Conversation> {
        if contact.user_id == self.user_id {
            return Err(CoreError::Validation(
                "cannot start a conversation with yourself".to_string(),
            ));
        }

        let existing = self
            .directory
            .list_conversations()
            .await?
            .into_iter()
            .find(|c| c.is_direct_between(&self.user_id, &contact.user_id));

        let conversation = match existing {
            Some(conversation) => {
                debug!(conversation_id = %conversation.id, "reusing direct conversation");
                conversation
            }
            None => {
                let request = CreateConversationRequest {
                    kind: ConversationType::Direct,
                    participant_ids: vec![self.user_id.clone(), contact.user_id.clone()],
                    context: None,
                };
                match self.directory.create_conversation(&request).await {
                    Ok(conversation) => conversation,
                    Err(err) => {
                        self.bus.publish(CoreEvent::Notice(Notice::error(format!(
                            "Could not open conversation with {}: {err}",
                            contact.label()
                        ))));
                        return Err(err);
                    }
                }
            }
        };

        self.bus
            .publish(CoreEvent::ConversationActivated(conversation.clone()));
        Ok(conversation)
    }

    /// Write `outcome` into the results slot, unless something newer was
    /// issued or applied first.
    fn apply(
        results: &Mutex<SearchResults>,
        issued: &AtomicU64,
        applied: &AtomicU64,
        seq: u64,
        query: String,
        outcome: std::result::Result<Vec<Contact>, String>,
    ) {
        if issued.load(Ordering::SeqCst) != seq {
            return;
        }
        let prev = applied.fetch_max(seq, Ordering::SeqCst);
        if prev >= seq {
            return;
        }
        let mut slot = results.lock();
        match outcome {
            Ok(contacts) => {
                *slot = SearchResults {
                    query,
                    contacts,
                    error: None,
                };
            }
            Err(err) => {
                warn!(query = %query, error = %err, "contact search failed");
                *slot = SearchResults {
                    query,
                    contacts: Vec::new(),
                    error: Some(err),
                };
            }
        }
    }
}
