//! Infrastructure layer - stores, services and runtime machinery

pub mod api_key;
pub mod auth;
pub mod background;
pub mod license;
pub mod logging;
pub mod observability;
pub mod scheduler;
pub mod storage;
