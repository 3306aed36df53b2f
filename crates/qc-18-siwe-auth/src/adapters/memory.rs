//! In-Memory Nonce Store Adapter
//!
//! Implements the `NonceStore` port on a lock-guarded hash map. Suitable for
//! a single process; entries are lost on restart.

use crate::domain::entities::{ConsumeOutcome, NonceEntry};
use crate::ports::outbound::{NonceStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Process-local nonce store.
#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
    /// nonce -> entry
    entries: RwLock<HashMap<String, NonceEntry>>,
}

impl InMemoryNonceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry issued strictly before `cutoff`, consumed or not.
    /// Returns the number removed.
    pub fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.issued_at >= cutoff);
        let removed = before - entries.len();

        if removed > 0 {
            debug!("[qc-18] Purged {} nonce(s) issued before {}", removed, cutoff);
        }
        removed
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn register(&self, entry: NonceEntry) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&entry.nonce) {
            return Ok(false);
        }
        entries.insert(entry.nonce.clone(), entry);
        Ok(true)
    }

    async fn lookup(&self, nonce: &str) -> Result<Option<NonceEntry>, StoreError> {
        Ok(self.entries.read().get(nonce).cloned())
    }

    async fn consume(&self, nonce: &str) -> Result<ConsumeOutcome, StoreError> {
        let mut entries = self.entries.write();
        let outcome = match entries.get_mut(nonce) {
            None => ConsumeOutcome::Unknown,
            Some(entry) if entry.consumed => ConsumeOutcome::AlreadyConsumed,
            Some(entry) => {
                entry.consumed = true;
                ConsumeOutcome::Consumed
            }
        };
        Ok(outcome)
    }
}
