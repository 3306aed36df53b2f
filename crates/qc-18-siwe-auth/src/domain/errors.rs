//! # Sign-In Errors
//!
//! Error taxonomy for message parsing, signature recovery and validation.
//!
//! Every validation failure is carried as data inside
//! [`VerificationResult::Rejected`](super::entities::VerificationResult);
//! only [`AuthError`] crosses the core boundary as an `Err`.

use super::entities::Address;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure to parse or build a sign-in message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The input text is empty
    #[error("Message is empty")]
    EmptyMessage,

    /// First line is not `{domain} wants you to sign in with your Ethereum account:`
    #[error("Invalid message header")]
    InvalidHeader,

    /// Domain is empty or carries more than an authority component
    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),

    /// Address line is not `0x` followed by 40 hex digits
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    /// Mixed-case address whose casing is not its EIP-55 checksum
    #[error("Address {0} does not match its EIP-55 checksum")]
    ChecksumMismatch(String),

    /// A required line is absent or not where the layout puts it
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A blank separator line was expected
    #[error("Expected blank line at line {line}")]
    ExpectedBlankLine { line: usize },

    /// Content left over after the last recognised field
    #[error("Unexpected content at line {line}: {content:?}")]
    UnexpectedLine { line: usize, content: String },

    /// Timestamp is not RFC 3339
    #[error("Invalid {field} timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Chain ID is not a positive decimal integer
    #[error("Invalid chain ID: {0:?}")]
    InvalidChainId(String),

    /// Only version "1" exists
    #[error("Unsupported version: expected 1, got {0:?}")]
    UnsupportedVersion(String),

    /// Nonce is shorter than 8 characters or not alphanumeric
    #[error("Invalid nonce: {0:?}")]
    InvalidNonce(String),

    /// URI or resource is not an absolute URI
    #[error("Invalid {field} URI {value:?}: {reason}")]
    InvalidUri {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Free-text field is empty or spans more than one line
    #[error("Invalid {0}: must be a single non-empty line")]
    InvalidLine(&'static str),

    /// `expiration_time` is not after `issued_at`
    #[error("Expiration time must be after issued-at time")]
    ExpiresBeforeIssued,

    /// `not_before` is after `expiration_time`
    #[error("Not-before time must not be after expiration time")]
    NotBeforeAfterExpiration,
}

/// Failure to decode a signature or recover its signer.
///
/// Reference: EIP-2, EIP-191
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Signature string is not hex
    #[error("Invalid signature encoding: {0}")]
    InvalidHex(String),

    /// Signature is not 65 bytes
    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    /// Invalid recovery ID (v must be 0, 1, 27, or 28)
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// r or s is zero or not below the curve order
    #[error("Signature scalar out of range")]
    InvalidScalar,

    /// Failed to recover public key from signature
    #[error("Failed to recover public key")]
    RecoveryFailed,
}

impl SignatureError {
    /// `true` when the signature could not even be decoded; `false` when it
    /// decoded but is mathematically unrecoverable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::InvalidHex(_) | Self::InvalidLength(_) | Self::InvalidRecoveryId(_)
        )
    }
}

/// Why a sign-in attempt was refused. Exactly one per rejection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionReason {
    /// Message text does not parse
    #[error("Malformed message: {0}")]
    Malformed(ParseError),

    /// Signature cannot be decoded or recovered
    #[error("Bad signature: {0}")]
    BadSignature(SignatureError),

    /// Recovered signer is not the address the message claims
    #[error("Signer {recovered} does not match message address {claimed}")]
    AddressMismatch { claimed: Address, recovered: Address },

    /// Message was minted for another site
    #[error("Domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch { expected: String, actual: String },

    /// Message nonce is not the one bound to the caller's session
    #[error("Nonce does not match the session nonce")]
    NonceMismatch,

    /// Nonce was never issued by this server
    #[error("Nonce was never issued")]
    UnknownNonce,

    /// Nonce was already consumed by an earlier sign-in
    #[error("Nonce has already been used")]
    NonceReplay,

    /// Chain is not accepted by this server
    #[error("Chain ID {chain_id} is not accepted")]
    ChainMismatch { chain_id: u64 },

    /// `now` is before the message's not-before time
    #[error("Message is not valid before {not_before}")]
    NotYetValid { not_before: DateTime<Utc> },

    /// `now` is after the message's expiration time
    #[error("Message expired at {expiration_time}")]
    Expired { expiration_time: DateTime<Utc> },
}

impl RejectionReason {
    /// Stable machine-readable tag for logs and transport mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::BadSignature(_) => "bad_signature",
            Self::AddressMismatch { .. } => "address_mismatch",
            Self::DomainMismatch { .. } => "domain_mismatch",
            Self::NonceMismatch => "nonce_mismatch",
            Self::UnknownNonce => "unknown_nonce",
            Self::NonceReplay => "nonce_replay",
            Self::ChainMismatch { .. } => "chain_mismatch",
            Self::NotYetValid { .. } => "not_yet_valid",
            Self::Expired { .. } => "expired",
        }
    }
}

impl From<ParseError> for RejectionReason {
    fn from(err: ParseError) -> Self {
        Self::Malformed(err)
    }
}

impl From<SignatureError> for RejectionReason {
    fn from(err: SignatureError) -> Self {
        Self::BadSignature(err)
    }
}

/// Infrastructure failure: the core could not reach a trustworthy verdict.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The nonce store could not be read or written
    #[error("Nonce store unavailable: {0}")]
    StoreUnavailable(String),

    /// Every freshly drawn nonce already existed in the store
    #[error("Could not mint a unique nonce after {attempts} attempts")]
    NonceCollision { attempts: usize },
}
