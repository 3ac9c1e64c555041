//! Collaborators the login flow consumes but does not own.

use async_trait::async_trait;
use shared::{
    domain::Username,
    error::{ApiException, ErrorCode},
};
use thiserror::Error;
use url::Url;

/// Fire-and-forget authentication trigger.
pub trait AuthService: Send + Sync {
    fn login(&self);
}

#[async_trait]
pub trait EnvironmentLookup: Send + Sync {
    async fn base_url(&self, username: &Username) -> Result<Url, LookupError>;
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to build partner environment request: {0}")]
    Request(#[from] ApiException),
    #[error("partner environment request failed: {0}")]
    Transport(String),
    #[error("partner environment endpoint returned status {0}")]
    Status(u16),
    #[error("failed to decode partner environment response: {0}")]
    Decode(String),
    #[error("partner environment returned an invalid base url: {0}")]
    InvalidUrl(String),
}

impl LookupError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Request(err) => err.code,
            Self::Transport(_) => ErrorCode::Transport,
            Self::Status(_) => ErrorCode::Status,
            Self::Decode(_) | Self::InvalidUrl(_) => ErrorCode::Decode,
        }
    }
}
