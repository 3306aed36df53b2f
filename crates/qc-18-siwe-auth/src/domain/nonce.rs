//! # Nonce Generation
//!
//! Sign-in nonces are drawn from the OS CSPRNG over `[A-Za-z0-9]`.
//! Each character carries log2(62) ≈ 5.95 bits, so the default length
//! of 17 gives a little over 101 bits of entropy.

use super::message::MIN_NONCE_LENGTH;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Default nonce length in characters.
pub const DEFAULT_NONCE_LENGTH: usize = 17;

/// Longest nonce the generator will produce.
pub const MAX_NONCE_LENGTH: usize = 128;

/// Mints unpredictable alphanumeric nonces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceGenerator {
    length: usize,
}

impl NonceGenerator {
    /// Generator for nonces of `length` characters, clamped to
    /// `MIN_NONCE_LENGTH..=MAX_NONCE_LENGTH`.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(MIN_NONCE_LENGTH, MAX_NONCE_LENGTH),
        }
    }

    /// Characters per nonce.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Draw a fresh nonce.
    pub fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_LENGTH)
    }
}
