//! API Key generation
//!
//! Generates `<scheme>_<prefix>_<secret>` credentials and their stored hashes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::api_key::CredentialFormat;

/// Result of generating a new API key
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// The full API key (only shown once at creation)
    pub key: String,
    /// The plaintext lookup prefix
    pub prefix: String,
    /// The hashed key for storage
    pub hash: String,
}

/// Generator for secure API keys
#[derive(Debug, Clone, Default)]
pub struct ApiKeyGenerator {
    format: CredentialFormat,
}

impl ApiKeyGenerator {
    pub fn new(format: CredentialFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &CredentialFormat {
        &self.format
    }

    /// Generate a new API key
    pub fn generate(&self) -> GeneratedApiKey {
        let prefix = random_segment(self.format.prefix_length);
        let secret = random_segment(self.format.secret_length);

        self.from_parts(prefix, &secret)
    }

    /// Assemble a key from known segments (for deterministic tests)
    pub fn from_parts(&self, prefix: String, secret: &str) -> GeneratedApiKey {
        let key = self.format.assemble(&prefix, secret);
        let hash = hash_key(&key);

        GeneratedApiKey { key, prefix, hash }
    }
}

/// Lowercase hex SHA-256 of the full key
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Verify an API key against a stored hash
pub fn verify_key(key: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_key(key), stored_hash)
}

/// Alphanumeric string from URL-safe base64 with `-` and `_` removed
fn random_segment(length: usize) -> String {
    let mut segment = String::with_capacity(length);
    let mut bytes = vec![0u8; length.max(1)];

    while segment.len() < length {
        rand::thread_rng().fill_bytes(&mut bytes);
        segment.extend(
            URL_SAFE_NO_PAD
                .encode(&bytes)
                .chars()
                .filter(|c| c.is_ascii_alphanumeric()),
        );
    }

    segment.truncate(length);
    segment
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;

    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
