use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid base url {0}")]
    InvalidBaseUrl(String),
}

impl CartError {
    /// HTTP status of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CartError::Status { status, .. } => Some(*status),
            CartError::Transport(err) => err.status(),
            CartError::Decode(_) | CartError::InvalidBaseUrl(_) => None,
        }
    }
}

pub type CartResult<T> = Result<T, CartError>;
