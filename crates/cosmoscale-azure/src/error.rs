//! Azure collaborator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AzureError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("token request failed: {0}")]
    Token(String),

    #[error("invalid primary key for account {account}: {reason}")]
    InvalidKey { account: String, reason: String },

    #[error("no primary key configured for account {0}")]
    UnknownAccount(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type AzureResult<T> = Result<T, AzureError>;
