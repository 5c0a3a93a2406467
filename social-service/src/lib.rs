pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    bot_detection::bot_detection_middleware,
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SocialConfig;
use crate::services::{
    AccountService, ClerkApi, ClerkSessionVerifier, FeedService, ImageHost, NotificationService,
    SocialStore, TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: SocialConfig,
    pub store: Arc<dyn SocialStore>,
    pub tokens: TokenService,
    pub clerk_sessions: ClerkSessionVerifier,
    pub accounts: AccountService,
    pub feed: FeedService,
    pub notifications: NotificationService,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wires the services over the given store and upstream providers.
    pub fn new(
        config: SocialConfig,
        store: Arc<dyn SocialStore>,
        clerk: Arc<dyn ClerkApi>,
        images: Arc<dyn ImageHost>,
    ) -> Result<Self, AppError> {
        let tokens = TokenService::new(&config.jwt);
        let clerk_sessions =
            ClerkSessionVerifier::new(&config.clerk).map_err(AppError::ConfigError)?;

        let notifications = NotificationService::new(store.clone());
        let accounts = AccountService::new(
            store.clone(),
            tokens.clone(),
            clerk,
            notifications.clone(),
        );
        let feed = FeedService::new(store.clone(), images, notifications.clone());

        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.requests,
            config.rate_limit.window_seconds,
            config.rate_limit.trusted_proxies.clone(),
        );

        Ok(Self {
            config,
            store,
            tokens,
            clerk_sessions,
            accounts,
            feed,
            notifications,
            ip_rate_limiter,
        })
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let auth = || from_fn_with_state(state.clone(), middleware::auth_middleware);

    let users = Router::new()
        .route("/signup", post(handlers::users::signup))
        .route("/login", post(handlers::users::login))
        .route("/profile/:username", get(handlers::users::get_profile))
        .merge(
            Router::new()
                .route("/profile", put(handlers::users::update_profile))
                .route("/sync", post(handlers::users::sync_user))
                .route(
                    "/me",
                    get(handlers::users::get_me).post(handlers::users::get_me),
                )
                .route(
                    "/follow/:targetUserId",
                    post(handlers::users::follow_user),
                )
                .route_layer(auth()),
        );

    let posts = Router::new()
        .route("/", get(handlers::posts::list_posts))
        .route("/:postId", get(handlers::posts::get_post))
        .route("/user/:username", get(handlers::posts::list_user_posts))
        .merge(
            Router::new()
                .route("/", post(handlers::posts::create_post))
                .route("/:postId/like", post(handlers::posts::like_post))
                .route("/:postId", delete(handlers::posts::delete_post))
                .route_layer(auth()),
        );

    let comments = Router::new()
        .route("/post/:postId", get(handlers::comments::list_comments))
        .merge(
            Router::new()
                .route("/post/:postId", post(handlers::comments::create_comment))
                .route("/:commentId", delete(handlers::comments::delete_comment))
                .route_layer(auth()),
        );

    let notifications = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route(
            "/:notificationId",
            delete(handlers::notifications::delete_notification),
        )
        .route_layer(auth());

    let ip_limiter = state.ip_rate_limiter.clone();
    let cors = cors_layer(&state.config.security.allowed_origins);

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .nest("/api/users", users)
        .nest("/api/posts", posts)
        .nest("/api/comments", comments)
        .nest("/api/notifications", notifications)
        .with_state(state)
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(bot_detection_middleware))
        .layer(cors);

    Ok(app)
}

/// Allow-list CORS with credentials so the Clerk `__session` cookie is sent.
/// A `*` entry opens CORS to any origin without credentials.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Ignoring invalid CORS origin '{}': {}", o, e);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
