//! # Shared Crypto - Ethereum-Compatible Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, EIP-191 | Message digests, address derivation |
//! | `ecdsa` | secp256k1 | Recoverable personal-message signatures |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, low-S normalization (EIP-2)
//! - **EIP-191**: personal messages are domain separated from transaction payloads

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{address_from_verifying_key, Secp256k1KeyPair, RECOVERABLE_SIGNATURE_LENGTH};
pub use errors::CryptoError;
pub use hashing::{keccak256, personal_message_hash, Hash, PERSONAL_MESSAGE_PREFIX};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
