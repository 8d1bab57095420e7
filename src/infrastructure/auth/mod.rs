//! Authentication infrastructure module
//!
//! Verification of operator bearer tokens.

mod jwt;

pub use jwt::{JwtConfig, JwtService, OperatorClaims};

#[cfg(test)]
pub(crate) use jwt::test_claims;
