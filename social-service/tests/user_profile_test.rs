mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn public_profile_by_username() {
    let app = TestApp::spawn().await;
    let (id, _) = app.signup("hopper").await;

    let res = app.get("/api/users/profile/hopper", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["id"], id.as_str());
    assert_eq!(res.body["user"]["userName"], "hopper");
    assert_eq!(res.body["user"]["followers"], json!([]));
    assert!(res.body["user"].get("password").is_none());
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/users/profile/nobody", None).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "User not found");
}

#[tokio::test]
async fn update_profile_changes_only_whitelisted_fields() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("knuth").await;

    let res = app
        .put(
            "/api/users/profile",
            Some(&token),
            json!({
                "bio": "Premature optimization",
                "location": "Stanford",
                "firstName": "Donald",
                "userName": "hijacked",
                "email": "hijacked@example.com",
                "followers": ["000000000000000000000000"],
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["bio"], "Premature optimization");
    assert_eq!(res.body["user"]["location"], "Stanford");
    assert_eq!(res.body["user"]["firstName"], "Donald");
    assert_eq!(res.body["user"]["userName"], "knuth");
    assert_eq!(res.body["user"]["email"], "knuth@example.com");
    assert_eq!(res.body["user"]["followers"], json!([]));

    let public = app.get("/api/users/profile/knuth", None).await;
    assert_eq!(public.body["user"]["bio"], "Premature optimization");
}

#[tokio::test]
async fn update_profile_validates_lengths() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("verbose").await;

    let res = app
        .put(
            "/api/users/profile",
            Some(&token),
            json!({ "bio": "x".repeat(161) }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Bio must be at most 160 characters");
}

#[tokio::test]
async fn update_profile_requires_auth() {
    let app = TestApp::spawn().await;

    let res = app
        .put("/api/users/profile", None, json!({ "bio": "anonymous" }))
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
