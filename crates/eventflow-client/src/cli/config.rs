use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use eventflow_core::CoreConfig;

/// Client configuration loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Base URL of the EventFlow API
    pub api_base: Option<String>,

    /// WebSocket URL of the push gateway
    pub gateway_url: Option<String>,

    /// User the client acts as
    pub user_id: Option<String>,

    /// Bearer token; EVENTFLOW_TOKEN in the environment is the fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Directory for drafts and other local state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Unread reconcile poll interval, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_seconds: Option<u64>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Where the config lives when --config is not given.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eventflow")
            .join("config.json")
    }

    /// Turn the file contents into a runnable core configuration. The
    /// endpoints and user id are required; the token falls back to the
    /// EVENTFLOW_TOKEN environment variable.
    pub fn into_core(self) -> Result<CoreConfig> {
        let api_base = self.api_base.context("config is missing apiBase")?;
        let gateway_url = self.gateway_url.context("config is missing gatewayUrl")?;
        let user_id = self.user_id.context("config is missing userId")?;

        let mut core = CoreConfig::new(api_base, gateway_url, user_id);
        core.auth_token = self
            .auth_token
            .or_else(|| std::env::var("EVENTFLOW_TOKEN").ok());
        if let Some(dir) = self.data_dir {
            core.data_dir = dir;
        }
        if let Some(seconds) = self.poll_seconds {
            core.poll_interval = Duration::from_secs(seconds);
        }
        Ok(core)
    }
}
