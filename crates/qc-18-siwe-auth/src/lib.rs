//! # Sign-In with Ethereum Subsystem (QC-18)
//!
//! Passwordless login for address holders: the server issues a single-use
//! nonce, the client signs an EIP-4361 message embedding it, and this crate
//! decides whether the signed message authenticates its address.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Message codec, signer recovery, claim checks; no I/O
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound interfaces
//! - **Adapters Layer** (`adapters/`): In-memory nonce store
//! - **Service Layer** (`service.rs`): Wires domain logic to ports
//!
//! ## Security Notes
//!
//! - **EIP-2 High S**: High-S signatures are normalized and recover the same signer
//! - **Replay Prevention**: A nonce is consumed atomically by the first accepted sign-in
//! - **Domain Binding**: Messages minted for another domain are refused
//! - Nonces are compared in constant time
//!
//! ## Example
//!
//! ```no_run
//! use qc_18_siwe_auth::{AuthConfig, InMemoryNonceStore, SiweAuthApi, SiweAuthService};
//!
//! # async fn run(message: &str, signature: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let service = SiweAuthService::new(AuthConfig::new("example.com"), InMemoryNonceStore::new())?;
//!
//! let nonce = service.issue_nonce().await?;
//! // ... the client signs a message carrying `nonce` ...
//! let claims = service.expected_claims(&nonce);
//! let verdict = service.verify(message, signature, &claims, chrono::Utc::now()).await?;
//! println!("accepted: {}", verdict.is_accepted());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::memory::InMemoryNonceStore;
pub use config::{AuthConfig, ConfigError};
pub use domain::entities::{
    Address, ConsumeOutcome, ExpectedClaims, NonceEntry, TimeStamp, VerificationResult,
};
pub use domain::errors::{AuthError, ParseError, RejectionReason, SignatureError};
pub use domain::message::{Message, MessageBuilder};
pub use domain::nonce::{NonceGenerator, DEFAULT_NONCE_LENGTH};
pub use domain::signature::{batch_recover, recover_address, recover_signer, SiweSignature};
pub use ports::inbound::SiweAuthApi;
pub use ports::outbound::{NonceStore, StoreError};
pub use service::SiweAuthService;
