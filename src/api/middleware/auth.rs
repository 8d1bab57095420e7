//! API key authentication extractor

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{AuthFailure, AuthenticatedKey};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that requires a valid API key in the `X-API-Key` header
#[derive(Debug, Clone)]
pub struct RequireApiKey(pub AuthenticatedKey);

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = api_key_header(&parts.headers)?;

        let key = state.authenticator.authenticate(header).await?;

        debug!(prefix = %key.prefix, "API key authenticated");
        Ok(RequireApiKey(key))
    }
}

/// Raw header value; a value that is not valid UTF-8 counts as malformed
fn api_key_header(headers: &HeaderMap) -> Result<Option<&str>, AuthFailure> {
    headers
        .get(API_KEY_HEADER)
        .map(|value| value.to_str().map_err(|_| AuthFailure::Malformed))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_x_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "lm_abcd1234_secret".parse().unwrap());

        assert_eq!(api_key_header(&headers), Ok(Some("lm_abcd1234_secret")));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(api_key_header(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn test_bearer_is_not_an_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer lm_abcd1234_secret".parse().unwrap());

        assert_eq!(api_key_header(&headers), Ok(None));
    }

    #[test]
    fn test_non_utf8_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_bytes(b"lm_\xff").unwrap());

        assert_eq!(api_key_header(&headers), Err(AuthFailure::Malformed));
    }
}
