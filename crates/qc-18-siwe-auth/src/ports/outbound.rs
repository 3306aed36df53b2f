//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits that define dependencies this subsystem needs.

use crate::domain::entities::{ConsumeOutcome, NonceEntry};
use crate::domain::errors::AuthError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Error from nonce store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or answered with an error
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => AuthError::StoreUnavailable(detail),
        }
    }
}

/// Key-value store of issued nonces.
///
/// The core never deletes entries; expiry is up to the implementation.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Insert a fresh entry.
    ///
    /// Returns `false`, leaving the store untouched, when the nonce already
    /// exists.
    async fn register(&self, entry: NonceEntry) -> Result<bool, StoreError>;

    /// Fetch the entry for `nonce`, if any.
    async fn lookup(&self, nonce: &str) -> Result<Option<NonceEntry>, StoreError>;

    /// Atomically flip `consumed` from false to true.
    ///
    /// Of any number of concurrent callers for one nonce, at most one sees
    /// [`ConsumeOutcome::Consumed`].
    async fn consume(&self, nonce: &str) -> Result<ConsumeOutcome, StoreError>;
}

#[async_trait]
impl<T: NonceStore + ?Sized> NonceStore for Arc<T> {
    async fn register(&self, entry: NonceEntry) -> Result<bool, StoreError> {
        (**self).register(entry).await
    }

    async fn lookup(&self, nonce: &str) -> Result<Option<NonceEntry>, StoreError> {
        (**self).lookup(nonce).await
    }

    async fn consume(&self, nonce: &str) -> Result<ConsumeOutcome, StoreError> {
        (**self).consume(nonce).await
    }
}
