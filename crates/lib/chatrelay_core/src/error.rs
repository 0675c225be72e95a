//! Forwarding errors.

use thiserror::Error;

/// Convenience alias for forwarding results.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors raised while forwarding a message to the chat-completion API.
///
/// Display strings are meant for logs only. None of them carry the remote
/// response body; [`ChatError::Status`] keeps it in a separate field.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing or invalid settings. Operator-fixable, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Access token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network failure talking to the remote API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("Chat completion request failed with HTTP {status}")]
    Status { status: u16, body: String },

    /// A success response whose body is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The caller cancelled before the call completed.
    #[error("Chat request cancelled")]
    Cancelled,
}

impl ChatError {
    /// Classification label used in structured log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Config(_) => "configuration",
            ChatError::Auth(_) => "authentication",
            ChatError::Transport(_) | ChatError::Status { .. } => "transport",
            ChatError::Parse(_) => "parse",
            ChatError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Transport(e.to_string())
    }
}
