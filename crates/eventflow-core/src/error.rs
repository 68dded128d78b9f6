use thiserror::Error;

/// Errors produced by the messaging core, grouped by how callers recover:
/// validation stays local to the component that raised it, transport loss
/// degrades push to polling, API and network failures are retryable, and
/// authorization failures are not.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input rejected before any request was made
    #[error("validation failed: {0}")]
    Validation(String),

    /// The push gateway is not connected; polling still covers delivery
    #[error("push transport unavailable")]
    TransportUnavailable,

    /// The API answered with a non-success status
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API rejected our credentials
    #[error("not authorized")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("gateway error: {0}")]
    Gateway(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether retrying the same operation later could succeed. Validation
    /// and authorization failures will not fix themselves.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Validation(_) | CoreError::Unauthorized | CoreError::Codec(_) => false,
            CoreError::Api { status, .. } => *status >= 500 || *status == 429,
            CoreError::TransportUnavailable | CoreError::Network(_) | CoreError::Gateway(_) => true,
        }
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(!CoreError::Validation("empty".to_string()).is_retryable());
        assert!(!CoreError::Unauthorized.is_retryable());
        assert!(CoreError::TransportUnavailable.is_retryable());
        assert!(CoreError::Api {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!CoreError::Api {
            status: 404,
            message: "not found".to_string()
        }
        .is_retryable());
    }
}
