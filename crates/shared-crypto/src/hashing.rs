//! # Keccak-256 Hashing
//!
//! Ethereum's flavour of SHA-3 (original Keccak padding) and the EIP-191
//! "personal message" digest built on top of it.

use sha3::{Digest, Keccak256};

/// Keccak-256 output (256-bit).
pub type Hash = [u8; 32];

/// EIP-191 version `0x45` prefix. The decimal byte length of the message
/// follows it, then the message itself.
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Hash data with Keccak-256 (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest signed by `personal_sign` / `eth_sign` wallets.
///
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`
/// where the length is the message byte count in ASCII decimal.
pub fn personal_message_hash(message: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX);
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}
