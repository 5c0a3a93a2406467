mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use common::{test_config, TestApp};
use std::net::SocketAddr;

const PROXY: &str = "192.0.2.10";

fn request(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/posts");
    if let Some(xff) = forwarded_for {
        builder = builder.header("x-forwarded-for", xff);
    }
    let mut req = builder.body(Body::empty()).unwrap();
    let addr = SocketAddr::new(peer.parse().unwrap(), 50000);
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn limited_app(requests: u32, trusted_proxies: &[&str]) -> TestApp {
    let mut config = test_config();
    config.rate_limit.requests = requests;
    config.rate_limit.window_seconds = 60;
    config.rate_limit.trusted_proxies = trusted_proxies
        .iter()
        .map(|ip| ip.parse().unwrap())
        .collect();
    TestApp::with_config(config).await
}

#[tokio::test]
async fn requests_over_limit_are_rejected() {
    let app = limited_app(2, &[]).await;

    assert_eq!(app.send(request("203.0.113.7", None)).await.status, StatusCode::OK);
    assert_eq!(app.send(request("203.0.113.7", None)).await.status, StatusCode::OK);

    let limited = app.send(request("203.0.113.7", None)).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers.contains_key("retry-after"));

    // Other clients keep their own budget.
    assert_eq!(app.send(request("198.51.100.1", None)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn forged_forwarded_for_does_not_reset_budget() {
    let app = limited_app(1, &[]).await;

    assert_eq!(
        app.send(request("203.0.113.7", Some("10.9.0.1"))).await.status,
        StatusCode::OK
    );

    for i in 2..10 {
        let forged = format!("10.9.0.{}", i);
        let res = app.send(request("203.0.113.7", Some(&forged))).await;
        assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    }
    assert_eq!(app.state.ip_rate_limiter.tracked_clients(), 1);
}

#[tokio::test]
async fn trusted_proxy_is_limited_per_forwarded_client() {
    let app = limited_app(1, &[PROXY]).await;

    assert_eq!(
        app.send(request(PROXY, Some("203.0.113.20"))).await.status,
        StatusCode::OK
    );
    assert_eq!(
        app.send(request(PROXY, Some("203.0.113.21"))).await.status,
        StatusCode::OK
    );
    assert_eq!(
        app.send(request(PROXY, Some("203.0.113.20"))).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}
