//! # Signer Recovery (secp256k1, EIP-191)
//!
//! Decodes a 65-byte `personal_sign` signature and recovers the address
//! that produced it.
//!
//! ## Security Notes
//!
//! - **High S (EIP-2)**: folded to `(r, n - s)` with the opposite parity
//!   before recovery
//! - **Scalar Range Validation**: R and S must be in [1, n-1]
//! - **Constant-Time Operations**: range checks use `subtle`
//! - Recovery itself is done by k256

use super::entities::Address;
use super::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use rayon::prelude::*;
use shared_crypto::{
    address_from_verifying_key, personal_message_hash, Hash, RECOVERABLE_SIGNATURE_LENGTH,
};
use std::fmt;
use std::str::FromStr;
use subtle::{Choice, ConstantTimeEq};

/// secp256k1 curve order n
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// floor(n / 2), the largest S in EIP-2 low form.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// A recoverable `personal_sign` signature: `r || s || v`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SiweSignature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes)
    pub s: [u8; 32],
    /// Recovery ID as sent by the wallet (0, 1, 27, or 28)
    pub v: u8,
}

impl SiweSignature {
    /// Split raw signature bytes. Only the length is checked here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != RECOVERABLE_SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }

    /// Decode 130 hex digits, with or without a `0x` prefix.
    pub fn from_hex(input: &str) -> Result<Self, SignatureError> {
        let digits = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(digits).map_err(|e| SignatureError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// `r || s || v`
    pub fn to_bytes(&self) -> [u8; RECOVERABLE_SIGNATURE_LENGTH] {
        let mut out = [0u8; RECOVERABLE_SIGNATURE_LENGTH];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

impl From<[u8; RECOVERABLE_SIGNATURE_LENGTH]> for SiweSignature {
    fn from(bytes: [u8; RECOVERABLE_SIGNATURE_LENGTH]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { r, s, v: bytes[64] }
    }
}

impl FromStr for SiweSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for SiweSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiweSignature({})", self.to_hex())
    }
}

// =============================================================================
// RECOVERY
// =============================================================================

/// Recover the signer of the exact message text, hashed per EIP-191.
pub fn recover_signer(message: &str, signature: &SiweSignature) -> Result<Address, SignatureError> {
    recover_address(&personal_message_hash(message.as_bytes()), signature)
}

/// Recover the address that signed a 32-byte digest.
///
/// Checks, in order: recovery ID, scalar range, then point recovery.
/// A high-S signature recovers the same key as its low-S twin.
pub fn recover_address(
    message_hash: &Hash,
    signature: &SiweSignature,
) -> Result<Address, SignatureError> {
    let mut recovery_id = parse_recovery_id(signature.v)?;

    if !is_valid_scalar(&signature.r) || !is_valid_scalar(&signature.s) {
        return Err(SignatureError::InvalidScalar);
    }

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let mut sig = Signature::from_slice(&sig_bytes).map_err(|_| SignatureError::InvalidScalar)?;

    // k256 only recovers from low-S signatures
    if !is_low_s(&signature.s) {
        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }
    }

    let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(Address::from_bytes(address_from_verifying_key(&recovered_key)))
}

/// Recover many signers in parallel. Output order matches input order.
pub fn batch_recover(items: &[(&str, SiweSignature)]) -> Vec<Result<Address, SignatureError>> {
    items
        .par_iter()
        .map(|(message, signature)| recover_signer(message, signature))
        .collect()
}

/// Parse the recovery ID from the V value.
///
/// Supports both raw (0, 1) and Ethereum-style (27, 28) encodings.
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let parity = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    Ok(RecoveryId::new(parity == 1, false))
}

/// Constant-time big-endian comparison of two 32-byte scalars.
/// Returns `(less, greater)`.
fn ct_compare(value: &[u8; 32], bound: &[u8; 32]) -> (Choice, Choice) {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        let byte_less = Choice::from((value[i] < bound[i]) as u8);
        let byte_greater = Choice::from((value[i] > bound[i]) as u8);

        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }

    (less, greater)
}

/// `s <= n/2`
fn is_low_s(s: &[u8; 32]) -> bool {
    let (_, greater) = ct_compare(s, &SECP256K1_HALF_ORDER);
    (!greater).into()
}

/// `0 < scalar < n`
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }

    let (less, _) = ct_compare(scalar, &SECP256K1_ORDER);
    (!is_zero & less).into()
}
