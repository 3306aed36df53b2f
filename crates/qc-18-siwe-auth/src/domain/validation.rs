//! # Claim Validation
//!
//! Pure checks applied to a parsed message once its signer is known.
//! The store-backed steps live in the service; everything here is
//! deterministic and side-effect free.

use super::entities::{Address, ExpectedClaims, NonceEntry};
use super::errors::RejectionReason;
use super::message::Message;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

/// The recovered signer must be the address the message names.
pub fn check_signer(message: &Message, recovered: Address) -> Result<(), RejectionReason> {
    if recovered != message.address {
        return Err(RejectionReason::AddressMismatch {
            claimed: message.address,
            recovered,
        });
    }
    Ok(())
}

/// Exact, case-sensitive domain match.
pub fn check_domain(message: &Message, expected: &str) -> Result<(), RejectionReason> {
    if message.domain != expected {
        return Err(RejectionReason::DomainMismatch {
            expected: expected.to_string(),
            actual: message.domain.clone(),
        });
    }
    Ok(())
}

/// Nonce must equal the session's nonce. Compared in constant time.
pub fn check_nonce(message: &Message, expected: &str) -> Result<(), RejectionReason> {
    let matches: bool = message.nonce.as_bytes().ct_eq(expected.as_bytes()).into();
    if !matches {
        return Err(RejectionReason::NonceMismatch);
    }
    Ok(())
}

/// Signer, domain and nonce checks, in that order.
pub fn check_claims(
    message: &Message,
    recovered: Address,
    expected: &ExpectedClaims,
) -> Result<(), RejectionReason> {
    check_signer(message, recovered)?;
    check_domain(message, &expected.domain)?;
    check_nonce(message, &expected.nonce)
}

/// The store must know the nonce and it must still be unconsumed.
pub fn check_nonce_entry(entry: Option<&NonceEntry>) -> Result<(), RejectionReason> {
    match entry {
        None => Err(RejectionReason::UnknownNonce),
        Some(entry) if entry.consumed => Err(RejectionReason::NonceReplay),
        Some(_) => Ok(()),
    }
}

/// Chain must be one the server accepts.
pub fn check_chain(message: &Message, expected: &ExpectedClaims) -> Result<(), RejectionReason> {
    if !expected.chain_ids.contains(&message.chain_id) {
        return Err(RejectionReason::ChainMismatch {
            chain_id: message.chain_id,
        });
    }
    Ok(())
}

/// `not_before <= now <= expiration_time`; both bounds inclusive.
pub fn check_validity_window(message: &Message, now: DateTime<Utc>) -> Result<(), RejectionReason> {
    if let Some(not_before) = &message.not_before {
        if message.is_not_yet_valid_at(now) {
            return Err(RejectionReason::NotYetValid {
                not_before: not_before.as_datetime(),
            });
        }
    }
    if let Some(expiration) = &message.expiration_time {
        if message.is_expired_at(now) {
            return Err(RejectionReason::Expired {
                expiration_time: expiration.as_datetime(),
            });
        }
    }
    Ok(())
}
