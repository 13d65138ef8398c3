use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Assignment already in progress for task {0}")]
    AssignmentPending(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Message shown to the operator: the server's `detail` verbatim when it
    /// sent one, otherwise `fallback`.
    pub fn operator_message(&self, fallback: &str) -> String {
        match self {
            ConsoleError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ConsoleError::AssignmentPending(_) | ConsoleError::Timeout(_) => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
            || matches!(self, ConsoleError::NotAuthenticated)
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
