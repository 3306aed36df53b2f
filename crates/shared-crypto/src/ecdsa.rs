//! # ECDSA Signatures (secp256k1)
//!
//! Recoverable secp256k1 signatures in the Ethereum wire layout.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2), recovery id flipped to match
//! - Secret scalar zeroized on drop by `SigningKey` itself
//!
//! ## Use Cases
//!
//! - Wallet-side `personal_sign` for login challenges
//! - Address derivation from recovered verifying keys

use crate::hashing::{keccak256, personal_message_hash, Hash};
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};

/// `r (32) || s (32) || v (1)`
pub const RECOVERABLE_SIGNATURE_LENGTH: usize = 65;

/// Offset added to the recovery id by Ethereum wallets (`v = 27 | 28`).
const ETHEREUM_V_OFFSET: u8 = 27;

/// Derive the 20-byte Ethereum address of a public key.
///
/// Last 20 bytes of `keccak256(x || y)` over the uncompressed point without
/// its `0x04` tag.
pub fn address_from_verifying_key(key: &VerifyingKey) -> [u8; 20] {
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Ethereum address controlled by this key.
    pub fn address(&self) -> [u8; 20] {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest, returning `r || s || v` with `v` in `{27, 28}`.
    pub fn sign_prehash(
        &self,
        digest: &Hash,
    ) -> Result<[u8; RECOVERABLE_SIGNATURE_LENGTH], CryptoError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        // Normalize S to low value (EIP-2)
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let mut out = [0u8; RECOVERABLE_SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + ETHEREUM_V_OFFSET;
        Ok(out)
    }

    /// `personal_sign` a message (EIP-191 digest, then [`Self::sign_prehash`]).
    pub fn sign_personal_message(
        &self,
        message: &[u8],
    ) -> Result<[u8; RECOVERABLE_SIGNATURE_LENGTH], CryptoError> {
        self.sign_prehash(&personal_message_hash(message))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}
