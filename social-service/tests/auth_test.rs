mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{clerk_session_token, TestApp, TEST_PASSWORD};
use serde_json::json;
use social_service::services::ClerkUser;

#[tokio::test]
async fn signup_returns_token_and_account() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/users/signup",
            None,
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "userName": "ada",
                "email": "  Ada@Example.com ",
                "password": TEST_PASSWORD,
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["message"], "User created successfully");
    assert_eq!(res.body["user"]["userName"], "ada");
    assert_eq!(res.body["user"]["email"], "ada@example.com");
    assert!(res.body["user"].get("password").is_none());
    assert!(!res.body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let app = TestApp::spawn().await;
    app.signup("grace").await;

    let res = app
        .post(
            "/api/users/signup",
            None,
            json!({
                "firstName": "Other",
                "lastName": "Person",
                "userName": "someone_else",
                "email": "grace@example.com",
                "password": TEST_PASSWORD,
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "User already exist");
}

#[tokio::test]
async fn signup_requires_every_field() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/users/signup",
            None,
            json!({ "userName": "half", "email": "half@example.com" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "All fields are required");
}

#[tokio::test]
async fn login_with_valid_credentials() {
    let app = TestApp::spawn().await;
    let (id, _) = app.signup("linus").await;

    let res = app
        .post(
            "/api/users/login",
            None,
            json!({ "email": "LINUS@example.com", "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Login successful");
    assert_eq!(res.body["user"]["id"], id.as_str());

    let token = res.body["token"].as_str().unwrap();
    let me = app.get("/api/users/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["userName"], "linus");
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email() {
    let app = TestApp::spawn().await;
    app.signup("margaret").await;

    let wrong = app
        .post(
            "/api/users/login",
            None,
            json!({ "email": "margaret@example.com", "password": "nope" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["error"], "Invalid email or password");

    let unknown = app
        .post(
            "/api/users/login",
            None,
            json!({ "email": "ghost@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["error"], "Invalid email or password");
}

#[tokio::test]
async fn protected_route_requires_token() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/users/me", None).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Unauthorized - you must be logged in");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/users/me", Some("not-a-jwt")).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Unauthorized access");
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("alan").await;

    let mut config = common::test_config();
    config.jwt.secret = "a-different-secret".to_string();
    let other = TestApp::with_config(config).await;

    let res = other.get("/api/users/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("cookie_monster").await;

    let request = Request::builder()
        .uri("/api/users/me")
        .header(header::COOKIE, format!("theme=dark; __session={}", token))
        .body(Body::empty())
        .unwrap();
    let res = app.send(request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["userName"], "cookie_monster");
}

#[tokio::test]
async fn clerk_user_is_provisioned_once() {
    let app = TestApp::spawn().await;
    app.clerk.insert(
        ClerkUser::new("user_2abcDEF123456", "Barbara@Example.com")
            .with_names("Barbara", "Liskov"),
    );
    let token = clerk_session_token("user_2abcDEF123456");

    let before = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(before.status, StatusCode::NOT_FOUND);
    assert_eq!(before.body["error"], "User not found");

    let first = app.post("/api/users/sync", Some(&token), json!({})).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["message"], "User created successfully");
    assert_eq!(first.body["user"]["userName"], "barbara");
    assert_eq!(first.body["user"]["email"], "barbara@example.com");
    assert_eq!(first.body["user"]["clerkId"], "user_2abcDEF123456");

    let second = app.post("/api/users/sync", Some(&token), json!({})).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["message"], "User already exists");
    assert_eq!(second.body["user"]["id"], first.body["user"]["id"]);

    let me = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["firstName"], "Barbara");
}

#[tokio::test]
async fn clerk_sync_disambiguates_taken_username() {
    let app = TestApp::spawn().await;
    app.signup("edsger").await;
    app.clerk
        .insert(ClerkUser::new("user_XYZ987ABCDEF", "edsger@elsewhere.org"));
    let token = clerk_session_token("user_XYZ987ABCDEF");

    let res = app.post("/api/users/sync", Some(&token), json!({})).await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["userName"], "edsger_abcdef");
}

#[tokio::test]
async fn sync_with_local_token_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("local_only").await;

    let res = app.post("/api/users/sync", Some(&token), json!({})).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sync_for_unknown_clerk_user_is_not_found() {
    let app = TestApp::spawn().await;
    let token = clerk_session_token("user_missing");

    let res = app.post("/api/users/sync", Some(&token), json!({})).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
