use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::PageRequest;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Fetcher exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Failed to launch fetcher: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Retrieves the raw, unparsed payload for one page of a provider's catalog.
///
/// Implementations must be safe to call concurrently for different offsets.
/// They are not responsible for timeouts; callers bound each call and drop
/// the future when it runs too long, so anything the call owns (a child
/// process, a connection) must be released on drop.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Box<F> {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        (**self).fetch(request).await
    }
}
