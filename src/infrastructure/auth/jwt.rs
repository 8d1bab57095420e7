//! Operator bearer token verification
//!
//! Tokens are issued by an external identity provider and signed with a
//! shared HS256 secret. This service only verifies them.

use std::fmt::Debug;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Claims carried by an operator token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorClaims {
    /// Subject (operator identity)
    pub sub: String,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
    /// Issued at timestamp (Unix epoch)
    #[serde(default)]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl OperatorClaims {
    pub fn operator(&self) -> &str {
        &self.sub
    }
}

/// Configuration for JWT verification
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[hidden]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }
}

/// JWT service verifying HS256 operator tokens
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let mut required = vec!["exp"];

        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }

        match &config.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }

        // Configured claims must be present, not just correct when present
        validation.set_required_spec_claims(&required);

        Self {
            config,
            decoding_key,
            validation,
        }
    }

    /// Validate a JWT token and return the claims
    pub fn verify(&self, token: &str) -> Result<OperatorClaims, DomainError> {
        let token_data = decode::<OperatorClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| DomainError::validation(format!("Invalid JWT: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Sign claims with the configured secret (test tokens only)
    #[cfg(test)]
    pub(crate) fn sign(&self, claims: &OperatorClaims) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
pub(crate) fn test_claims(sub: &str) -> OperatorClaims {
    let now = chrono::Utc::now();
    OperatorClaims {
        sub: sub.to_string(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
        iss: None,
        aud: None,
    }
}
