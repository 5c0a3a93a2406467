mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn inbox_is_newest_first_and_populated() {
    let app = TestApp::spawn().await;
    let (owner_id, owner) = app.signup("celebrity").await;
    let (_, fan) = app.signup("admirer").await;
    let post_id = app.create_post(&owner, "look at this").await;

    app.post(&format!("/api/users/follow/{}", owner_id), Some(&fan), json!({}))
        .await;
    app.post(&format!("/api/posts/{}/like", post_id), Some(&fan), json!({}))
        .await;

    let res = app.get("/api/notifications", Some(&owner)).await;

    assert_eq!(res.status, StatusCode::OK);
    let notifications = res.body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0]["type"], "like");
    assert_eq!(notifications[0]["post"]["content"], "look at this");
    assert_eq!(notifications[0]["to"], owner_id.as_str());
    assert_eq!(notifications[1]["type"], "follow");
    assert_eq!(notifications[1]["from"]["userName"], "admirer");
}

#[tokio::test]
async fn inbox_requires_auth() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/notifications", None).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_recipient_can_delete_notification() {
    let app = TestApp::spawn().await;
    let (target_id, target) = app.signup("target").await;
    let (_, follower) = app.signup("follower").await;

    app.post(
        &format!("/api/users/follow/{}", target_id),
        Some(&follower),
        json!({}),
    )
    .await;

    let inbox = app.get("/api/notifications", Some(&target)).await;
    let notification_id = inbox.body["notifications"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/notifications/{}", notification_id);

    let stranger = app.delete(&uri, Some(&follower)).await;
    assert_eq!(stranger.status, StatusCode::NOT_FOUND);
    assert_eq!(stranger.body["error"], "Notification not found");

    let owner = app.delete(&uri, Some(&target)).await;
    assert_eq!(owner.status, StatusCode::OK);
    assert_eq!(owner.body["message"], "Notification deleted successfully");

    let inbox = app.get("/api/notifications", Some(&target)).await;
    assert_eq!(inbox.body["notifications"], json!([]));
}
