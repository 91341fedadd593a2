//! The network primitive the worker fetches through.

use async_trait::async_trait;

use crate::http::{Request, Response};

/// A rejected fetch. HTTP error statuses are responses, not errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("response too large: {0}")]
    TooLarge(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Host network fetch.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}
