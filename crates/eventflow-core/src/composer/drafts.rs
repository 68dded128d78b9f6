//! Per-conversation draft persistence.
//!
//! Unsent composer text survives restarts as one JSON file in the data
//! directory. Drafts are never delivered; they exist purely so a failed or
//! abandoned send can be picked up later. Every mutation is transactional
//! against the file: if the write fails, the in-memory state is rolled back
//! so memory and disk never disagree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// A composer's unsent state for one conversation. Attachment bytes are not
/// persisted, only the file names, so a restored draft can prompt the user
/// to re-stage the files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDraft {
    pub conversation_id: String,
    pub text: String,
    #[serde(default)]
    pub attachment_names: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationDraft {
    pub fn new(
        conversation_id: impl Into<String>,
        text: impl Into<String>,
        attachment_names: Vec<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            attachment_names,
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment_names.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DraftStoreError {
    #[error("failed to read drafts: {0}")]
    Read(String),
    #[error("failed to parse drafts: {0}")]
    Parse(String),
    #[error("failed to save drafts: {0}")]
    Write(String),
}

/// JSON-file-backed store of [`ConversationDraft`]s, keyed by conversation.
pub struct DraftStore {
    path: PathBuf,
    drafts: HashMap<String, ConversationDraft>,
}

impl DraftStore {
    /// Open the store, loading whatever is on disk. A missing file is a
    /// fresh store; an unreadable or corrupt one starts empty with a
    /// warning rather than blocking composition.
    pub fn new(data_dir: &Path) -> Self {
        let path = data_dir.join("drafts.json");
        let drafts = match Self::load_from_file(&path) {
            Ok(drafts) => drafts,
            Err(err) => {
                warn!(error = %err, "could not load drafts, starting empty");
                HashMap::new()
            }
        };
        Self { path, drafts }
    }

    fn load_from_file(path: &Path) -> Result<HashMap<String, ConversationDraft>, DraftStoreError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| DraftStoreError::Parse(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(DraftStoreError::Read(e.to_string())),
        }
    }

    fn save_to_file(&self) -> Result<(), DraftStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DraftStoreError::Write(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.drafts)
            .map_err(|e| DraftStoreError::Write(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| DraftStoreError::Write(e.to_string()))
    }

    /// Save a draft, replacing any previous one for the conversation.
    pub fn save(&mut self, draft: ConversationDraft) -> Result<(), DraftStoreError> {
        let id = draft.conversation_id.clone();
        let previous = self.drafts.insert(id.clone(), draft);
        if let Err(err) = self.save_to_file() {
            match previous {
                Some(p) => {
                    self.drafts.insert(id, p);
                }
                None => {
                    self.drafts.remove(&id);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn load(&self, conversation_id: &str) -> Option<&ConversationDraft> {
        self.drafts.get(conversation_id)
    }

    /// Remove a draft after its message was confirmed sent. Clearing a
    /// conversation with no draft is fine.
    pub fn clear(&mut self, conversation_id: &str) -> Result<(), DraftStoreError> {
        let Some(removed) = self.drafts.remove(conversation_id) else {
            return Ok(());
        };
        if let Err(err) = self.save_to_file() {
            self.drafts.insert(removed.conversation_id.clone(), removed);
            return Err(err);
        }
        Ok(())
    }

    /// Non-empty drafts, newest first, for recovery on startup.
    pub fn pending(&self) -> Vec<&ConversationDraft> {
        let mut drafts: Vec<_> = self.drafts.values().filter(|d| !d.is_empty()).collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        drafts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_load_clear_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = DraftStore::new(dir.path());

        store
            .save(ConversationDraft::new("conv-1", "half-written reply", vec![]))
            .unwrap();
        assert_eq!(store.load("conv-1").unwrap().text, "half-written reply");

        store.clear("conv-1").unwrap();
        assert!(store.load("conv-1").is_none());
    }

    #[test]
    fn test_drafts_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = DraftStore::new(dir.path());
            store
                .save(ConversationDraft::new(
                    "conv-1",
                    "see you at the venue",
                    vec!["floorplan.pdf".to_string()],
                ))
                .unwrap();
        }

        let reopened = DraftStore::new(dir.path());
        let draft = reopened.load("conv-1").unwrap();
        assert_eq!(draft.text, "see you at the venue");
        assert_eq!(draft.attachment_names, vec!["floorplan.pdf"]);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("drafts.json"), "{not valid json").unwrap();

        let store = DraftStore::new(dir.path());
        assert!(store.pending().is_empty());
    }

    #[test]
    fn test_clear_unknown_conversation_is_ok() {
        let dir = tempdir().unwrap();
        let mut store = DraftStore::new(dir.path());
        store.clear("conv-404").unwrap();
    }

    #[test]
    fn test_pending_skips_empty_and_sorts_newest_first() {
        let dir = tempdir().unwrap();
        let mut store = DraftStore::new(dir.path());

        let mut older = ConversationDraft::new("conv-1", "first", vec![]);
        older.updated_at = Utc::now() - chrono::Duration::hours(1);
        store.save(older).unwrap();
        store
            .save(ConversationDraft::new("conv-2", "second", vec![]))
            .unwrap();
        store
            .save(ConversationDraft::new("conv-3", "   ", vec![]))
            .unwrap();

        let pending = store.pending();
        let ids: Vec<&str> = pending.iter().map(|d| d.conversation_id.as_str()).collect();
        assert_eq!(ids, vec!["conv-2", "conv-1"]);
    }
}
