//! Shared setup for social-service integration tests.
//!
//! Drives the full router in-process over the in-memory store, with mock
//! Clerk and image providers.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use social_service::{
    build_router,
    config::{
        ClerkConfig, CloudinaryConfig, Environment, JwtConfig, MongoConfig, RateLimitConfig,
        SecurityConfig, SocialConfig, StoreBackend, DEFAULT_CLERK_API_URL,
    },
    services::{InMemoryStore, MockClerkClient, MockImageHost},
    AppState,
};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

const CLERK_PRIVATE_KEY: &str = include_str!("../fixtures/clerk_private.pem");
const CLERK_PUBLIC_KEY: &str = include_str!("../fixtures/clerk_public.pem");

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub clerk: Arc<MockClerkClient>,
    pub images: Arc<MockImageHost>,
}

/// Body and status of a finished request.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub fn test_config() -> SocialConfig {
    SocialConfig {
        common: CoreConfig { port: 0 },
        environment: Environment::Dev,
        service_name: "social-service".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "social_test".to_string(),
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expiry_days: 7,
        },
        clerk: ClerkConfig {
            secret_key: Some("sk_test_123".to_string()),
            jwt_public_key: Some(CLERK_PUBLIC_KEY.to_string()),
            api_url: DEFAULT_CLERK_API_URL.to_string(),
            authorized_parties: vec![],
        },
        cloudinary: CloudinaryConfig {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: "social".to_string(),
            enabled: false,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            requests: 10_000,
            window_seconds: 60,
            trusted_proxies: vec![],
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: SocialConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clerk = Arc::new(MockClerkClient::new());
        let images = Arc::new(MockImageHost::new());

        let state = AppState::new(config, store.clone(), clerk.clone(), images.clone())
            .expect("Failed to build app state");
        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        TestApp {
            router,
            state,
            store,
            clerk,
            images,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Signs up `username` and returns `(user id, token)`.
    pub async fn signup(&self, username: &str) -> (String, String) {
        let res = self
            .post(
                "/api/users/signup",
                None,
                json!({
                    "firstName": "Test",
                    "lastName": "User",
                    "userName": username,
                    "email": format!("{}@example.com", username),
                    "password": TEST_PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {}", res.body);

        let id = res.body["user"]["id"]
            .as_str()
            .expect("user id missing")
            .to_string();
        let token = res.body["token"]
            .as_str()
            .expect("token missing")
            .to_string();
        (id, token)
    }

    /// Creates a text post and returns its id.
    pub async fn create_post(&self, token: &str, content: &str) -> String {
        let res = self
            .post("/api/posts", Some(token), json!({ "content": content }))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create post failed: {}", res.body);
        res.body["post"]["id"]
            .as_str()
            .expect("post id missing")
            .to_string()
    }
}

/// RS256 session token as Clerk would mint it for `clerk_user_id`.
pub fn clerk_session_token(clerk_user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": clerk_user_id,
        "sid": "sess_test",
        "azp": "http://localhost:3000",
        "iat": now,
        "exp": now + 300,
    });

    let key = EncodingKey::from_rsa_pem(CLERK_PRIVATE_KEY.as_bytes())
        .expect("Invalid test private key");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("Failed to sign Clerk token")
}
