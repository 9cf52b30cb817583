use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response. `message` is the server's own explanation when
    /// it sent one, otherwise the status reason.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("invalid service url: {0}")]
    InvalidUrl(String),

    #[error("malformed diagram document: {0}")]
    Decode(String),

    #[error("another diagram load is already in progress")]
    Busy,

    #[error("code generation is already running")]
    ExportInFlight,

    /// A newer load or a session shutdown superseded this request.
    #[error("result discarded")]
    Discarded,
}

impl BridgeError {
    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
