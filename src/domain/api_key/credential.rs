//! API key credential format and authentication failures

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::DomainError;

pub const DEFAULT_SCHEME: &str = "lm";
pub const DEFAULT_PREFIX_LENGTH: usize = 8;
pub const DEFAULT_SECRET_LENGTH: usize = 32;

const SEGMENT_DELIMITER: char = '_';

/// Prefix and secret segments are plain alphanumerics
static SEGMENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

/// Why a credential was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("API key is required")]
    Missing,

    #[error("API key is malformed")]
    Malformed,

    /// Unknown prefix, disabled key and wrong secret all collapse here
    #[error("API key is invalid or disabled")]
    NotFoundOrDisabled,
}

/// Externally visible class of an authentication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    Unauthenticated,
    Forbidden,
}

impl AuthFailure {
    pub fn kind(&self) -> AuthFailureKind {
        match self {
            Self::Missing | Self::Malformed => AuthFailureKind::Unauthenticated,
            Self::NotFoundOrDisabled => AuthFailureKind::Forbidden,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::NotFoundOrDisabled => "not_found_or_disabled",
        }
    }
}

/// Failure of an authentication attempt
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error(transparent)]
    Rejected(#[from] AuthFailure),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Shape of issued credentials: `<scheme>_<prefix>_<secret>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFormat {
    pub scheme: String,
    pub prefix_length: usize,
    pub secret_length: usize,
}

impl Default for CredentialFormat {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            prefix_length: DEFAULT_PREFIX_LENGTH,
            secret_length: DEFAULT_SECRET_LENGTH,
        }
    }
}

impl CredentialFormat {
    /// Join the segments into the bearer string handed to clients
    pub fn assemble(&self, prefix: &str, secret: &str) -> String {
        format!(
            "{}{}{}{}{}",
            self.scheme, SEGMENT_DELIMITER, prefix, SEGMENT_DELIMITER, secret
        )
    }
}

/// A structurally valid credential, borrowed from the raw header value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKeyCredential<'a> {
    raw: &'a str,
    prefix: &'a str,
}

impl<'a> ApiKeyCredential<'a> {
    pub fn parse(raw: &'a str, format: &CredentialFormat) -> Result<Self, AuthFailure> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthFailure::Missing);
        }

        let segments: Vec<&str> = raw.split(SEGMENT_DELIMITER).collect();
        let [scheme, prefix, secret] = segments.as_slice() else {
            return Err(AuthFailure::Malformed);
        };

        if *scheme != format.scheme
            || prefix.len() != format.prefix_length
            || !SEGMENT_PATTERN.is_match(prefix)
            || !SEGMENT_PATTERN.is_match(secret)
        {
            return Err(AuthFailure::Malformed);
        }

        Ok(Self {
            raw,
            prefix: *prefix,
        })
    }

    /// The full credential, which is what gets hashed
    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn prefix(&self) -> &'a str {
        self.prefix
    }
}
