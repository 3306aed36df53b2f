//! # Domain Entities
//!
//! Value types shared by the codec, the verifier and the validation engine.

use super::errors::{ParseError, RejectionReason};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::keccak256;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Address
// =============================================================================

/// 20-byte Ethereum account address.
///
/// Equality is byte equality, so differently-cased hex spellings of the
/// same account compare equal once parsed. Display is EIP-55 checksummed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// Wrap raw address bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case checksum encoding, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    /// Accepts `0x` + 40 hex digits. All-lowercase and all-uppercase input is
    /// taken as is; mixed case must be the exact EIP-55 checksum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| ParseError::InvalidAddress(s.to_string()))?;
        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        let address = Self(bytes);

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum() != s {
            return Err(ParseError::ChecksumMismatch(s.to_string()));
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

// =============================================================================
// TimeStamp
// =============================================================================

/// RFC 3339 timestamp that remembers its textual form.
///
/// Keeping the original text means a parsed message serializes back to the
/// bytes the wallet signed, whatever offset or precision it chose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeStamp {
    raw: String,
    instant: DateTime<Utc>,
}

impl TimeStamp {
    /// Parse an RFC 3339 timestamp. `field` names the message line in errors.
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ParseError> {
        let instant = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| ParseError::InvalidTimestamp {
                field,
                value: raw.to_string(),
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            raw: raw.to_string(),
            instant,
        })
    }

    /// The instant this timestamp denotes.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.instant
    }

    /// The timestamp exactly as it appears in message text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            instant,
        }
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// =============================================================================
// Nonce Store Records
// =============================================================================

/// One issued nonce as kept by the nonce store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceEntry {
    /// The nonce string (primary key)
    pub nonce: String,
    /// When the nonce was minted
    pub issued_at: DateTime<Utc>,
    /// Set once, by the first successful sign-in
    pub consumed: bool,
}

impl NonceEntry {
    /// Fresh, unconsumed entry.
    pub fn new(nonce: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            nonce: nonce.into(),
            issued_at,
            consumed: false,
        }
    }
}

/// Outcome of the store's atomic check-and-set on a nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Entry flipped from unconsumed to consumed by this call
    Consumed,
    /// Entry was already consumed; nothing changed
    AlreadyConsumed,
    /// No such entry
    Unknown,
}

// =============================================================================
// Verification Request/Result Types
// =============================================================================

/// What the server expects a sign-in message to claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedClaims {
    /// The server's own domain (authority)
    pub domain: String,
    /// The nonce bound to the caller's session
    pub nonce: String,
    /// Chains the server accepts logins for
    pub chain_ids: BTreeSet<u64>,
}

/// Verdict of a sign-in verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationResult {
    /// Signature, claims and nonce all check out; the nonce is now consumed
    Accepted { address: Address },
    /// The attempt was refused for exactly one reason
    Rejected { reason: RejectionReason },
}

impl VerificationResult {
    /// Whether the sign-in succeeded.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Authenticated address, if accepted.
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Accepted { address } => Some(*address),
            Self::Rejected { .. } => None,
        }
    }

    /// Rejection reason, if rejected.
    pub fn reason(&self) -> Option<&RejectionReason> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Vectors from EIP-55
    const CHECKSUMMED: [&str; 4] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_eip55_vectors() {
        for expected in CHECKSUMMED {
            let address: Address = expected.to_lowercase().parse().unwrap();
            assert_eq!(address.to_checksum(), expected);
            assert_eq!(address.to_string(), expected);
        }
    }

    #[test]
    fn test_checksummed_input_accepted() {
        for input in CHECKSUMMED {
            assert!(input.parse::<Address>().is_ok());
        }
    }

    #[test]
    fn test_case_insensitive_equality() {
        let lower: Address = CHECKSUMMED[0].to_lowercase().parse().unwrap();
        let upper: Address = format!("0x{}", &CHECKSUMMED[0][2..].to_uppercase())
            .parse()
            .unwrap();
        let mixed: Address = CHECKSUMMED[0].parse().unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        // flip the case of one letter
        let bad = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(matches!(
            bad.parse::<Address>(),
            Err(ParseError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn test_malformed_addresses_rejected() {
        for bad in [
            "",
            "0x",
            "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe",
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAedd",
            "0xZaAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        ] {
            assert!(
                matches!(bad.parse::<Address>(), Err(ParseError::InvalidAddress(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_timestamp_keeps_original_text() {
        let ts = TimeStamp::parse("Issued At", "2021-12-07T18:28:18.807+02:00").unwrap();
        assert_eq!(ts.as_str(), "2021-12-07T18:28:18.807+02:00");
        assert_eq!(
            ts.as_datetime(),
            DateTime::parse_from_rfc3339("2021-12-07T16:28:18.807Z").unwrap()
        );
    }

    #[test]
    fn test_timestamp_from_datetime_is_rfc3339_utc() {
        let instant = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ts = TimeStamp::from(instant);
        assert_eq!(ts.as_str(), "2024-01-01T00:00:00Z");
        assert_eq!(TimeStamp::parse("Issued At", ts.as_str()).unwrap(), ts);
    }

    #[test]
    fn test_timestamp_rejects_non_rfc3339() {
        for bad in ["yesterday", "2024-01-01", "2024-01-01T00:00:00", "1704067200"] {
            assert!(matches!(
                TimeStamp::parse("Issued At", bad),
                Err(ParseError::InvalidTimestamp { .. })
            ));
        }
    }

    #[test]
    fn test_verification_result_accessors() {
        let address = Address::from_bytes([7; 20]);
        let accepted = VerificationResult::Accepted { address };
        assert!(accepted.is_accepted());
        assert_eq!(accepted.address(), Some(address));
        assert!(accepted.reason().is_none());

        let rejected = VerificationResult::Rejected {
            reason: RejectionReason::NonceReplay,
        };
        assert!(!rejected.is_accepted());
        assert_eq!(rejected.address(), None);
        assert_eq!(rejected.reason(), Some(&RejectionReason::NonceReplay));
    }

    #[test]
    fn test_nonce_entry_starts_unconsumed() {
        let entry = NonceEntry::new("abcdefgh", Utc::now());
        assert!(!entry.consumed);
    }
}
