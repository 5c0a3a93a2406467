pub mod bot_detection;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;

pub use bot_detection::bot_detection_middleware;
pub use metrics::metrics_middleware;
pub use rate_limit::{
    create_ip_rate_limiter, ip_rate_limit_middleware, spawn_rate_limit_pruner, IpRateLimiter,
};
pub use tracing::{request_id_middleware, REQUEST_ID_HEADER};
