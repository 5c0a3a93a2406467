use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

type KeyedLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// Rate limiter keyed by client IP address.
///
/// `x-forwarded-for` is only believed when the connecting peer is one of the
/// trusted proxies; otherwise the socket address is the key.
#[derive(Clone)]
pub struct IpRateLimiter {
    limiter: Arc<KeyedLimiter>,
    trusted_proxies: Arc<Vec<IpAddr>>,
}

impl IpRateLimiter {
    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Drops keys whose quota has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

/// `requests` per `window_seconds`, refilled evenly across the window.
pub fn create_ip_rate_limiter(
    requests: u32,
    window_seconds: u64,
    trusted_proxies: Vec<IpAddr>,
) -> IpRateLimiter {
    let requests = NonZeroU32::new(requests.max(1)).unwrap_or(NonZeroU32::MIN);
    let period_ms = (window_seconds.max(1) * 1000) / u64::from(requests.get());
    let quota = Quota::with_period(Duration::from_millis(period_ms.max(1)))
        .unwrap_or_else(|| Quota::per_second(requests))
        .allow_burst(requests);

    IpRateLimiter {
        limiter: Arc::new(RateLimiter::dashmap(quota)),
        trusted_proxies: Arc::new(trusted_proxies),
    }
}

/// Prunes idle client keys every `every` for as long as the runtime lives.
pub fn spawn_rate_limit_pruner(limiter: IpRateLimiter, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let before = limiter.tracked_clients();
            limiter.prune();
            tracing::debug!(
                before,
                after = limiter.tracked_clients(),
                "Pruned rate limiter keys"
            );
        }
    });
}

/// Resolve the caller IP. The socket peer is authoritative unless it is a
/// trusted proxy, in which case the nearest untrusted `x-forwarded-for` hop
/// wins.
pub fn client_ip(request: &Request, trusted_proxies: &[IpAddr]) -> Option<IpAddr> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())?;

    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    let hops: Vec<IpAddr> = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| {
            s.split(',')
                .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                .collect()
        })
        .unwrap_or_default();

    hops.iter()
        .rev()
        .find(|hop| !trusted_proxies.contains(hop))
        .or_else(|| hops.first())
        .copied()
        .or(Some(peer))
}

pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(ip) = client_ip(&request, &limiter.trusted_proxies) else {
        tracing::warn!(path = %request.uri().path(), "Could not determine IP for rate limiting");
        return Ok(next.run(request).await);
    };

    match limiter.limiter.check_key(&ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(negative) => {
            let wait_time = negative.wait_time_from(DefaultClock::default().now());
            tracing::warn!(ip = %ip, retry_after = wait_time.as_secs(), "Rate limit exceeded");
            Err(AppError::TooManyRequests(
                "You have exceeded the rate limit. Please try again later.".to_string(),
                Some(wait_time.as_secs().max(1)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    const PROXY: &str = "192.0.2.10";

    fn app(limiter: IpRateLimiter) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(limiter, ip_rate_limit_middleware))
    }

    fn request(peer: &str, forwarded_for: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(xff) = forwarded_for {
            builder = builder.header("x-forwarded-for", xff);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        let addr = SocketAddr::new(peer.parse().unwrap(), 40000);
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn blocks_after_burst_is_spent() {
        let limiter = create_ip_rate_limiter(2, 60, vec![]);

        for _ in 0..2 {
            let res = app(limiter.clone()).oneshot(request("10.0.0.1", None)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app(limiter.clone()).oneshot(request("10.0.0.1", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key("retry-after"));
    }

    #[tokio::test]
    async fn limits_are_per_ip() {
        let limiter = create_ip_rate_limiter(1, 60, vec![]);

        let res = app(limiter.clone()).oneshot(request("10.0.0.1", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app(limiter.clone()).oneshot(request("10.0.0.2", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rotating_forwarded_for_is_ignored_without_trusted_proxy() {
        let limiter = create_ip_rate_limiter(1, 60, vec![]);

        let res = app(limiter.clone())
            .oneshot(request("10.0.0.1", Some("10.1.0.1")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        for i in 2..20 {
            let spoofed = format!("10.1.{}.{}", i / 256, i % 256);
            let res = app(limiter.clone())
                .oneshot(request("10.0.0.1", Some(&spoofed)))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        }
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn trusted_proxy_forwards_client_address() {
        let limiter = create_ip_rate_limiter(1, 60, vec![PROXY.parse().unwrap()]);

        let res = app(limiter.clone())
            .oneshot(request(PROXY, Some("203.0.113.5")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app(limiter.clone())
            .oneshot(request(PROXY, Some("203.0.113.6")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app(limiter.clone())
            .oneshot(request(PROXY, Some("203.0.113.5")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn spoofed_leftmost_hop_is_skipped_behind_trusted_proxy() {
        let trusted: Vec<IpAddr> = vec![PROXY.parse().unwrap()];
        let req = request(PROXY, Some("1.2.3.4, 203.0.113.9"));
        assert_eq!(client_ip(&req, &trusted), "203.0.113.9".parse().ok());
    }

    #[tokio::test]
    async fn prune_drops_replenished_keys() {
        let limiter = create_ip_rate_limiter(1000, 1, vec![]);
        let _ = app(limiter.clone()).oneshot(request("10.0.0.1", None)).await.unwrap();
        assert_eq!(limiter.tracked_clients(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[tokio::test]
    async fn unknown_ip_passes_through() {
        let limiter = create_ip_rate_limiter(1, 60, vec![]);
        for _ in 0..3 {
            let res = app(limiter.clone())
                .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
