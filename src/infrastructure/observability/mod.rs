//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    create_metrics_router, init_metrics, record_api_key_authentication,
    record_background_task_dropped, record_expirations, record_http_request,
    record_license_validation, ExpirationSource, PrometheusMetrics,
};
