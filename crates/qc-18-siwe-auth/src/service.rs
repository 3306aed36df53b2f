//! # Sign-In Service
//!
//! Application service layer that implements the `SiweAuthApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`SiweAuthApi`)
//! - Uses the outbound port (`NonceStore`) for the nonce lifecycle
//! - Delegates parsing, recovery and claim checks to the domain layer
//!
//! ## Verification Order
//!
//! Parse, recover, signer, domain, nonce, store lookup, chain, time window,
//! then the atomic consume. The first failing step decides the verdict and
//! nothing is written to the store before the consume.

use crate::config::{AuthConfig, ConfigError};
use crate::domain::entities::{
    Address, ConsumeOutcome, ExpectedClaims, NonceEntry, VerificationResult,
};
use crate::domain::errors::{AuthError, RejectionReason, SignatureError};
use crate::domain::message::Message;
use crate::domain::nonce::NonceGenerator;
use crate::domain::signature::{self, SiweSignature};
use crate::domain::validation;
use crate::ports::inbound::SiweAuthApi;
use crate::ports::outbound::NonceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Fresh draws attempted before `issue_nonce` gives up.
pub const MAX_ISSUE_ATTEMPTS: usize = 4;

/// Why `evaluate` stopped short of acceptance.
enum Outcome {
    Rejected(RejectionReason),
    Failed(AuthError),
}

impl From<RejectionReason> for Outcome {
    fn from(reason: RejectionReason) -> Self {
        Self::Rejected(reason)
    }
}

impl From<AuthError> for Outcome {
    fn from(err: AuthError) -> Self {
        Self::Failed(err)
    }
}

/// Sign-In with Ethereum service.
///
/// Holds no per-session state: the expected nonce arrives with each call
/// and every nonce record lives in the injected store.
pub struct SiweAuthService<S: NonceStore> {
    config: AuthConfig,
    generator: NonceGenerator,
    store: S,
}

impl<S: NonceStore> SiweAuthService<S> {
    /// Create a new sign-in service.
    ///
    /// # Arguments
    /// * `config` - Validated before use
    /// * `store` - Where issued nonces are recorded
    pub fn new(config: AuthConfig, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            generator: NonceGenerator::new(config.nonce_length),
            config,
            store,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The backing nonce store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mint and record a nonce stamped with `issued_at`.
    pub async fn issue_nonce_at(&self, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let nonce = self.generator.generate();
            let registered = self
                .store
                .register(NonceEntry::new(nonce.clone(), issued_at))
                .await
                .map_err(|e| {
                    error!("[qc-18] Failed to record nonce: {}", e);
                    AuthError::from(e)
                })?;

            if registered {
                info!("[qc-18] Issued nonce");
                return Ok(nonce);
            }
            warn!("[qc-18] Nonce collision, drawing again");
        }

        error!(
            "[qc-18] No unique nonce after {} attempts",
            MAX_ISSUE_ATTEMPTS
        );
        Err(AuthError::NonceCollision {
            attempts: MAX_ISSUE_ATTEMPTS,
        })
    }

    /// Recover many `(message, signature)` pairs in parallel.
    pub fn recover_batch(
        &self,
        items: &[(&str, SiweSignature)],
    ) -> Vec<Result<Address, SignatureError>> {
        signature::batch_recover(items)
    }

    async fn evaluate(
        &self,
        text: &str,
        signature_hex: &str,
        expected: &ExpectedClaims,
        now: DateTime<Utc>,
    ) -> Result<Address, Outcome> {
        let message = Message::parse(text).map_err(RejectionReason::from)?;

        let recovered = SiweSignature::from_hex(signature_hex)
            .and_then(|sig| signature::recover_signer(text, &sig))
            .map_err(RejectionReason::from)?;

        validation::check_claims(&message, recovered, expected)?;

        let entry = self
            .store
            .lookup(&message.nonce)
            .await
            .map_err(AuthError::from)?;
        validation::check_nonce_entry(entry.as_ref())?;

        validation::check_chain(&message, expected)?;
        validation::check_validity_window(&message, now)?;

        match self
            .store
            .consume(&message.nonce)
            .await
            .map_err(AuthError::from)?
        {
            ConsumeOutcome::Consumed => Ok(recovered),
            ConsumeOutcome::AlreadyConsumed => Err(RejectionReason::NonceReplay.into()),
            // Entry vanished between lookup and consume
            ConsumeOutcome::Unknown => Err(RejectionReason::UnknownNonce.into()),
        }
    }
}

#[async_trait]
impl<S: NonceStore> SiweAuthApi for SiweAuthService<S> {
    fn expected_claims(&self, session_nonce: &str) -> ExpectedClaims {
        ExpectedClaims {
            domain: self.config.domain.clone(),
            nonce: session_nonce.to_string(),
            chain_ids: self.config.chain_ids.clone(),
        }
    }

    async fn issue_nonce(&self) -> Result<String, AuthError> {
        self.issue_nonce_at(Utc::now()).await
    }

    async fn verify(
        &self,
        message: &str,
        signature: &str,
        expected: &ExpectedClaims,
        now: DateTime<Utc>,
    ) -> Result<VerificationResult, AuthError> {
        match self.evaluate(message, signature, expected, now).await {
            Ok(address) => {
                info!("[qc-18] Sign-in accepted for {}", address);
                Ok(VerificationResult::Accepted { address })
            }
            Err(Outcome::Rejected(reason)) => {
                warn!(kind = reason.kind(), "[qc-18] Sign-in rejected: {}", reason);
                Ok(VerificationResult::Rejected { reason })
            }
            Err(Outcome::Failed(err)) => {
                error!("[qc-18] Sign-in could not be evaluated: {}", err);
                Err(err)
            }
        }
    }
}
