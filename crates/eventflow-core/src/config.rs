use std::path::PathBuf;
use std::time::Duration;

/// Attachment constraints enforced by the composer before anything touches
/// the wire. Defaults follow the marketplace upload policy.
#[derive(Debug, Clone)]
pub struct ComposerLimits {
    /// Maximum number of files per message
    pub max_files: usize,
    /// Maximum size of a single file, in bytes
    pub max_file_size: u64,
    /// Exact MIME types accepted; anything else is rejected
    pub allowed_types: Vec<String>,
}

impl Default for ComposerLimits {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_size: 10 * 1024 * 1024,
            allowed_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "application/pdf",
                "text/plain",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Configuration for the messaging core.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the REST API, e.g. "https://api.eventflow.co.uk"
    pub api_base: String,
    /// WebSocket URL of the push gateway
    pub gateway_url: String,
    /// Authenticated user on whose behalf the core operates
    pub user_id: String,
    /// Bearer token sent with every API request, when present
    pub auth_token: Option<String>,
    /// Directory for local state such as drafts
    pub data_dir: PathBuf,
    /// How often the reconcile poll re-fetches the unread count
    pub poll_interval: Duration,
    /// Per-request timeout applied to every API call
    pub request_timeout: Duration,
    pub composer: ComposerLimits,
}

impl CoreConfig {
    pub fn new(
        api_base: impl Into<String>,
        gateway_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            gateway_url: gateway_url.into(),
            user_id: user_id.into(),
            auth_token: None,
            data_dir: Self::default_data_dir(),
            poll_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            composer: ComposerLimits::default(),
        }
    }

    /// Default to ~/.local/share/eventflow (or the platform equivalent)
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eventflow")
    }
}
