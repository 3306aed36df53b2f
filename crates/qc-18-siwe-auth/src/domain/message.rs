//! # Sign-In Message Codec
//!
//! EIP-4361 message model and its canonical text form.
//!
//! ## Canonical Layout
//!
//! ```text
//! {domain} wants you to sign in with your Ethereum account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: 1
//! Chain ID: {chain_id}
//! Nonce: {nonce}
//! Issued At: {issued_at}
//! Expiration Time: {expiration_time}
//! Not Before: {not_before}
//! Request ID: {request_id}
//! Resources:
//! - {resource}
//! ```
//!
//! Optional lines are omitted when unset. Without a statement both blank
//! lines stay. The text carries no trailing newline.
//!
//! ## Round-Trip Law
//!
//! For every `m` accepted by [`Message::validate`]:
//! `m.to_string().parse::<Message>() == Ok(m)`.

use super::entities::{Address, TimeStamp};
use super::errors::ParseError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use url::Url;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TIME_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";
const RESOURCE_ITEM_PREFIX: &str = "- ";

/// The only message version defined by EIP-4361.
pub const SUPPORTED_VERSION: &str = "1";

/// Shortest nonce a message may carry.
pub const MIN_NONCE_LENGTH: usize = 8;

/// A Sign-In with Ethereum message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Authority requesting the sign-in
    pub domain: String,
    /// Account performing the sign-in
    pub address: Address,
    /// Human-readable assertion shown to the user
    pub statement: Option<String>,
    /// Subject of the sign-in
    pub uri: String,
    /// Message version, always "1"
    pub version: String,
    /// EIP-155 chain the session is bound to
    pub chain_id: u64,
    /// Server-issued anti-replay token
    pub nonce: String,
    /// When the message was created
    pub issued_at: TimeStamp,
    /// After this instant the message is void
    pub expiration_time: Option<TimeStamp>,
    /// Before this instant the message is void
    pub not_before: Option<TimeStamp>,
    /// Opaque request correlation id
    pub request_id: Option<String>,
    /// Resources the user wishes to have resolved (empty when absent)
    pub resources: Vec<String>,
}

impl Message {
    /// Start building a message from its required fields.
    pub fn builder(
        domain: impl Into<String>,
        address: Address,
        uri: impl Into<String>,
        chain_id: u64,
        nonce: impl Into<String>,
        issued_at: impl Into<TimeStamp>,
    ) -> MessageBuilder {
        MessageBuilder {
            message: Self {
                domain: domain.into(),
                address,
                statement: None,
                uri: uri.into(),
                version: SUPPORTED_VERSION.to_string(),
                chain_id,
                nonce: nonce.into(),
                issued_at: issued_at.into(),
                expiration_time: None,
                not_before: None,
                request_id: None,
                resources: Vec::new(),
            },
        }
    }

    /// Parse canonical message text. Total: either every field is valid or
    /// an error is returned.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_message(text)
    }

    /// Check every field-level and cross-field invariant.
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_domain(&self.domain)?;
        if let Some(statement) = &self.statement {
            validate_single_line("statement", statement)?;
        }
        validate_uri("URI", &self.uri)?;
        if self.version != SUPPORTED_VERSION {
            return Err(ParseError::UnsupportedVersion(self.version.clone()));
        }
        if self.chain_id == 0 {
            return Err(ParseError::InvalidChainId(self.chain_id.to_string()));
        }
        validate_nonce(&self.nonce)?;
        if let Some(request_id) = &self.request_id {
            validate_single_line("request ID", request_id)?;
        }
        for resource in &self.resources {
            validate_uri("Resources", resource)?;
        }

        if let Some(expiration) = &self.expiration_time {
            if expiration.as_datetime() <= self.issued_at.as_datetime() {
                return Err(ParseError::ExpiresBeforeIssued);
            }
            if let Some(not_before) = &self.not_before {
                if not_before.as_datetime() > expiration.as_datetime() {
                    return Err(ParseError::NotBeforeAfterExpiration);
                }
            }
        }

        Ok(())
    }

    /// `now` is strictly before `not_before`.
    pub fn is_not_yet_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before
            .as_ref()
            .is_some_and(|not_before| now < not_before.as_datetime())
    }

    /// `now` is strictly after `expiration_time`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time
            .as_ref()
            .is_some_and(|expiration| now > expiration.as_datetime())
    }
}

impl FromStr for Message {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_message(text)
    }
}

impl fmt::Display for Message {
    /// Canonical serialization. This is the exact text wallets sign.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{HEADER_SUFFIX}\n{}\n\n", self.domain, self.address)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
        }
        write!(f, "\n{URI_TAG}{}", self.uri)?;
        write!(f, "\n{VERSION_TAG}{}", self.version)?;
        write!(f, "\n{CHAIN_ID_TAG}{}", self.chain_id)?;
        write!(f, "\n{NONCE_TAG}{}", self.nonce)?;
        write!(f, "\n{ISSUED_AT_TAG}{}", self.issued_at)?;
        if let Some(expiration) = &self.expiration_time {
            write!(f, "\n{EXPIRATION_TIME_TAG}{expiration}")?;
        }
        if let Some(not_before) = &self.not_before {
            write!(f, "\n{NOT_BEFORE_TAG}{not_before}")?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\n{REQUEST_ID_TAG}{request_id}")?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{RESOURCES_TAG}")?;
            for resource in &self.resources {
                write!(f, "\n{RESOURCE_ITEM_PREFIX}{resource}")?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for [`Message`]; `build` enforces the same rules as parsing.
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    /// Human-readable statement line.
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.message.statement = Some(statement.into());
        self
    }

    /// Instant after which the message is void.
    pub fn expiration_time(mut self, expiration_time: impl Into<TimeStamp>) -> Self {
        self.message.expiration_time = Some(expiration_time.into());
        self
    }

    /// Instant before which the message is void.
    pub fn not_before(mut self, not_before: impl Into<TimeStamp>) -> Self {
        self.message.not_before = Some(not_before.into());
        self
    }

    /// Opaque request id.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.message.request_id = Some(request_id.into());
        self
    }

    /// Append one resource URI.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.message.resources.push(resource.into());
        self
    }

    /// Validate and return the message.
    pub fn build(self) -> Result<Message, ParseError> {
        self.message.validate()?;
        Ok(self.message)
    }
}

// =============================================================================
// PARSER
// =============================================================================

/// Line-by-line reader over message text with 1-based line numbers.
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<&'a str> {
        self.lines.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn line_number(&self) -> usize {
        self.pos + 1
    }

    fn take(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        let line = self.peek().ok_or(ParseError::MissingField(field))?;
        self.advance();
        Ok(line)
    }

    fn expect_blank(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some("") => {
                self.advance();
                Ok(())
            }
            _ => Err(ParseError::ExpectedBlankLine {
                line: self.line_number(),
            }),
        }
    }

    fn optional_tagged(&mut self, tag: &str) -> Option<&'a str> {
        let value = self.peek()?.strip_prefix(tag)?;
        self.advance();
        Some(value)
    }

    fn tagged(&mut self, tag: &str, field: &'static str) -> Result<&'a str, ParseError> {
        self.optional_tagged(tag)
            .ok_or(ParseError::MissingField(field))
    }

    fn finish(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(content) => Err(ParseError::UnexpectedLine {
                line: self.line_number(),
                content: content.to_string(),
            }),
        }
    }
}

fn parse_message(text: &str) -> Result<Message, ParseError> {
    if text.is_empty() {
        return Err(ParseError::EmptyMessage);
    }

    // One trailing newline is tolerated
    let mut lines = LineCursor::new(text.strip_suffix('\n').unwrap_or(text));

    let header = lines.take("header")?;
    let domain = header
        .strip_suffix(HEADER_SUFFIX)
        .ok_or(ParseError::InvalidHeader)?;
    let address = lines.take("address")?.parse::<Address>()?;
    lines.expect_blank()?;

    let statement = match lines.peek() {
        None => return Err(ParseError::MissingField("URI")),
        Some("") => None,
        // A statement is always followed by a blank line
        Some(line) if lines.peek_next() == Some("") => {
            lines.advance();
            Some(line.to_string())
        }
        Some(_) => {
            return Err(ParseError::ExpectedBlankLine {
                line: lines.line_number(),
            })
        }
    };
    lines.expect_blank()?;

    let uri = lines.tagged(URI_TAG, "URI")?;
    let version = lines.tagged(VERSION_TAG, "Version")?;
    let chain_id = parse_chain_id(lines.tagged(CHAIN_ID_TAG, "Chain ID")?)?;
    let nonce = lines.tagged(NONCE_TAG, "Nonce")?;
    let issued_at = TimeStamp::parse("Issued At", lines.tagged(ISSUED_AT_TAG, "Issued At")?)?;
    let expiration_time = lines
        .optional_tagged(EXPIRATION_TIME_TAG)
        .map(|raw| TimeStamp::parse("Expiration Time", raw))
        .transpose()?;
    let not_before = lines
        .optional_tagged(NOT_BEFORE_TAG)
        .map(|raw| TimeStamp::parse("Not Before", raw))
        .transpose()?;
    let request_id = lines.optional_tagged(REQUEST_ID_TAG).map(str::to_string);

    let mut resources = Vec::new();
    if lines.peek() == Some(RESOURCES_TAG) {
        lines.advance();
        while let Some(resource) = lines.optional_tagged(RESOURCE_ITEM_PREFIX) {
            resources.push(resource.to_string());
        }
    }
    lines.finish()?;

    let message = Message {
        domain: domain.to_string(),
        address,
        statement,
        uri: uri.to_string(),
        version: version.to_string(),
        chain_id,
        nonce: nonce.to_string(),
        issued_at,
        expiration_time,
        not_before,
        request_id,
        resources,
    };
    message.validate()?;
    Ok(message)
}

fn parse_chain_id(raw: &str) -> Result<u64, ParseError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidChainId(raw.to_string()));
    }
    raw.parse::<u64>()
        .map_err(|_| ParseError::InvalidChainId(raw.to_string()))
}

// =============================================================================
// FIELD RULES
// =============================================================================

/// Domain must be a bare authority: `[userinfo@]host[:port]`.
pub(crate) fn validate_domain(domain: &str) -> Result<(), ParseError> {
    let invalid = || ParseError::InvalidDomain(domain.to_string());

    if domain.is_empty()
        || domain
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'))
    {
        return Err(invalid());
    }

    let url = Url::parse(&format!("https://{domain}")).map_err(|_| invalid())?;
    if url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(())
}

fn validate_uri(field: &'static str, value: &str) -> Result<(), ParseError> {
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ParseError::InvalidUri {
            field,
            value: value.to_string(),
            reason: "contains whitespace".to_string(),
        });
    }
    Url::parse(value).map_err(|e| ParseError::InvalidUri {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_nonce(nonce: &str) -> Result<(), ParseError> {
    if nonce.len() < MIN_NONCE_LENGTH || !nonce.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ParseError::InvalidNonce(nonce.to_string()));
    }
    Ok(())
}

fn validate_single_line(field: &'static str, value: &str) -> Result<(), ParseError> {
    if value.is_empty() || value.contains(['\n', '\r']) {
        return Err(ParseError::InvalidLine(field));
    }
    Ok(())
}
