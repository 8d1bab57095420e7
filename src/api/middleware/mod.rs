//! Extractors and middleware for the HTTP layer

mod admin_auth;
mod auth;
mod logging;
mod metrics;

pub use admin_auth::RequireOperator;
pub use auth::{RequireApiKey, API_KEY_HEADER};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
