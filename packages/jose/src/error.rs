//! Error types for compact JOSE building and parsing

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Result type alias for JOSE operations
pub type JoseResult<T> = Result<T, JoseError>;

/// Message carried by every verification or decryption failure.
pub(crate) const INVALID_TOKEN: &str = "invalid token";

/// Errors raised while manipulating field maps or building and parsing tokens
#[derive(Debug, Clone, Error)]
pub enum JoseError {
    /// A value could not be coerced to a field's declared type
    #[error("Cannot convert '{field}' value to {expected}: {reason}")]
    Conversion {
        /// Field identifier
        field: String,
        /// Declared type of the field
        expected: &'static str,
        /// Why the conversion was refused
        reason: String,
    },

    /// A stored value does not satisfy a strict typed read
    #[error("{0}")]
    RequiredType(String),

    /// Algorithm identifier is not registered or is excluded by policy
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Token rejected for security reasons
    #[error("Security violation: {0}")]
    Security(String),

    /// Token does not have the compact shape or encoding
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Compression codec unresolvable or payload corrupt
    #[error("Compression error: {0}")]
    Compression(String),

    /// Expiration time is in the past
    #[error(
        "Token expired at {expired_at}; current time {now}, allowed clock skew {skew_seconds}s"
    )]
    Expired {
        /// `exp` claim value
        expired_at: DateTime<Utc>,
        /// Clock reading used for validation
        now: DateTime<Utc>,
        /// Allowed clock skew in seconds
        skew_seconds: i64,
    },

    /// Not-before time is in the future
    #[error(
        "Token not valid before {not_before}; current time {now}, allowed clock skew {skew_seconds}s"
    )]
    Premature {
        /// `nbf` claim value
        not_before: DateTime<Utc>,
        /// Clock reading used for validation
        now: DateTime<Utc>,
        /// Allowed clock skew in seconds
        skew_seconds: i64,
    },

    /// Key material has the wrong shape or strength for the algorithm
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// No key was supplied and none could be located
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// A required claim is absent
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// A required claim has a different value
    #[error("Claim '{claim}' expected {expected}, found {actual}")]
    IncorrectClaim {
        /// Claim identifier
        claim: String,
        /// Expected value rendering
        expected: String,
        /// Actual value rendering
        actual: String,
    },

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Schema, registry or parser configuration is invalid
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl JoseError {
    /// Create a conversion error
    #[must_use]
    pub fn conversion(field: &str, expected: &'static str, reason: impl fmt::Display) -> Self {
        Self::Conversion {
            field: field.to_string(),
            expected,
            reason: reason.to_string(),
        }
    }

    /// Create a required type error for a type mismatch
    #[must_use]
    pub fn type_mismatch(field: &str, actual: &str, expected: &str) -> Self {
        Self::RequiredType(format!(
            "Cannot convert existing value of '{field}' of type '{actual}' to desired type \
             '{expected}'. Only signed integral kinds and dates are converted automatically."
        ))
    }

    /// Create a required type error for an unsafe numeric narrowing
    #[must_use]
    pub fn numeric_overflow(field: &str, value: i64, expected: &str) -> Self {
        Self::RequiredType(format!(
            "Value {value} of '{field}' is too large or too small to be represented as \
             {expected} (would cause numeric overflow)"
        ))
    }

    /// Create an unsupported algorithm error
    #[must_use]
    pub fn unsupported_algorithm(msg: impl fmt::Display) -> Self {
        Self::UnsupportedAlgorithm(msg.to_string())
    }

    /// Create a security error with a specific message
    #[must_use]
    pub fn security(msg: impl fmt::Display) -> Self {
        Self::Security(msg.to_string())
    }

    /// Create the opaque error used for every verification or decryption failure
    #[must_use]
    pub fn invalid_token() -> Self {
        Self::Security(INVALID_TOKEN.to_string())
    }

    /// Create a malformed token error
    #[must_use]
    pub fn malformed(msg: impl fmt::Display) -> Self {
        Self::MalformedToken(msg.to_string())
    }

    /// Create a compression error
    #[must_use]
    pub fn compression(msg: impl fmt::Display) -> Self {
        Self::Compression(msg.to_string())
    }

    /// Create an invalid key error
    #[must_use]
    pub fn invalid_key(msg: impl fmt::Display) -> Self {
        Self::InvalidKey(msg.to_string())
    }

    /// Create a missing key error
    #[must_use]
    pub fn missing_key(msg: impl fmt::Display) -> Self {
        Self::MissingKey(msg.to_string())
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl fmt::Display) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Whether this error came from a failed signature or decryption check
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::Security(msg) if msg == INVALID_TOKEN)
    }
}
