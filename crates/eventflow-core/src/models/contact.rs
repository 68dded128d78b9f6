use serde::{Deserialize, Serialize};

use super::conversation::ParticipantRole;

/// A user as returned by the contact directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: ParticipantRole,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Contact {
    /// Name to render in pickers and result lists, falling back to the
    /// email when a profile has no display name set.
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            return &self.display_name;
        }
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}
