//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Secret key bytes are zero or not below the curve order
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// The signing backend refused the digest
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}
