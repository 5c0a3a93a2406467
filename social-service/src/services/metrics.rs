//! Prometheus export and the domain counters of the social feed.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::models::NotificationKind;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// `method` is `local` or `clerk`.
pub fn record_signup(method: &'static str) {
    counter!("social_signups_total", "method" => method).increment(1);
}

pub fn record_post_created() {
    counter!("social_posts_created_total").increment(1);
}

pub fn record_like(liked: bool) {
    let action = if liked { "like" } else { "unlike" };
    counter!("social_likes_total", "action" => action).increment(1);
}

pub fn record_follow(following: bool) {
    let action = if following { "follow" } else { "unfollow" };
    counter!("social_follows_total", "action" => action).increment(1);
}

pub fn record_comment() {
    counter!("social_comments_total").increment(1);
}

pub fn record_notification(kind: NotificationKind) {
    counter!("social_notifications_total", "type" => kind.as_str()).increment(1);
}
