//! Sign-in configuration with validation.

use crate::domain::message::{validate_domain, MIN_NONCE_LENGTH};
use crate::domain::nonce::{DEFAULT_NONCE_LENGTH, MAX_NONCE_LENGTH};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// What this server accepts sign-ins for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// This server's domain (authority). There is no default.
    pub domain: String,
    /// Accepted chain IDs (default: {1})
    #[serde(default = "default_chain_ids")]
    pub chain_ids: BTreeSet<u64>,
    /// Characters per issued nonce (default: 17)
    #[serde(default = "default_nonce_length")]
    pub nonce_length: usize,
}

fn default_chain_ids() -> BTreeSet<u64> {
    BTreeSet::from([DEFAULT_CHAIN_ID])
}

fn default_nonce_length() -> usize {
    DEFAULT_NONCE_LENGTH
}

impl AuthConfig {
    /// Config for `domain` with default chains and nonce length.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            chain_ids: default_chain_ids(),
            nonce_length: default_nonce_length(),
        }
    }

    /// Replace the accepted chain set.
    pub fn with_chain_ids(mut self, chain_ids: impl IntoIterator<Item = u64>) -> Self {
        self.chain_ids = chain_ids.into_iter().collect();
        self
    }

    /// Override the nonce length.
    pub fn with_nonce_length(mut self, nonce_length: usize) -> Self {
        self.nonce_length = nonce_length;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_domain(&self.domain).map_err(|_| ConfigError::InvalidDomain(self.domain.clone()))?;

        if self.chain_ids.is_empty() {
            return Err(ConfigError::NoChains);
        }
        if self.chain_ids.contains(&0) {
            return Err(ConfigError::InvalidChainId(0));
        }

        if !(MIN_NONCE_LENGTH..=MAX_NONCE_LENGTH).contains(&self.nonce_length) {
            return Err(ConfigError::InvalidNonceLength(self.nonce_length));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Domain is empty or not a bare authority
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),
    /// No chain IDs configured
    #[error("at least one chain ID must be accepted")]
    NoChains,
    /// Chain IDs must be positive
    #[error("invalid chain ID: {0}")]
    InvalidChainId(u64),
    /// Nonce length outside 8..=128
    #[error("invalid nonce length {0}: must be between 8 and 128")]
    InvalidNonceLength(usize),
}
