//! Error types for the statusboard service

/// Errors that can occur in the statusboard service
#[derive(Debug, thiserror::Error)]
pub enum StatusboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Discord error: {0}")]
    Discord(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),
}

impl StatusboardError {
    /// True for errors that mean the referenced entity no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, StatusboardError::NotFound(_))
    }

    /// True for errors caused by missing permissions on the display surface
    pub fn is_forbidden(&self) -> bool {
        matches!(self, StatusboardError::Forbidden(_))
    }
}

/// Result type alias for statusboard operations
pub type Result<T> = std::result::Result<T, StatusboardError>;
