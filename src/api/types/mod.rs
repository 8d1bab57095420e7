//! Shared request/response types for the HTTP layer

mod error;
mod json;

pub use error::{ApiError, ApiErrorCode, ApiErrorDetail, ApiErrorResponse};
pub use json::{Json, ValidatedJson};
