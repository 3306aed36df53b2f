//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of this subsystem.

use crate::domain::entities::{ExpectedClaims, VerificationResult};
use crate::domain::errors::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Sign-In with Ethereum API.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait SiweAuthApi: Send + Sync {
    /// Claims a message must carry for the session holding `session_nonce`.
    fn expected_claims(&self, session_nonce: &str) -> ExpectedClaims;

    /// Mint a nonce and record it, unconsumed, before returning it.
    ///
    /// # Errors
    /// * `AuthError::StoreUnavailable` - the store could not record it
    /// * `AuthError::NonceCollision` - every draw collided with an existing nonce
    async fn issue_nonce(&self) -> Result<String, AuthError>;

    /// Verify a signed sign-in message at instant `now`.
    ///
    /// Validation failures come back as `Ok(VerificationResult::Rejected)`;
    /// `Err` is reserved for infrastructure failures.
    async fn verify(
        &self,
        message: &str,
        signature: &str,
        expected: &ExpectedClaims,
        now: DateTime<Utc>,
    ) -> Result<VerificationResult, AuthError>;
}
