mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn comment_is_created_and_embedded_in_post() {
    let app = TestApp::spawn().await;
    let (_, owner) = app.signup("poster").await;
    let (reader_id, reader) = app.signup("reader").await;
    let post_id = app.create_post(&owner, "discuss").await;

    let res = app
        .post(
            &format!("/api/comments/post/{}", post_id),
            Some(&reader),
            json!({ "content": "  first!  " }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["comment"]["content"], "first!");
    assert_eq!(res.body["comment"]["post"], post_id.as_str());
    assert_eq!(res.body["comment"]["user"]["id"], reader_id.as_str());

    let post = app.get(&format!("/api/posts/{}", post_id), None).await;
    let embedded = post.body["post"]["comments"].as_array().unwrap();
    assert_eq!(embedded.len(), 1);
    assert_eq!(embedded[0]["content"], "first!");
    assert_eq!(embedded[0]["user"]["userName"], "reader");

    let inbox = app.get("/api/notifications", Some(&owner)).await;
    let notifications = inbox.body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "comment");
    assert_eq!(notifications[0]["comment"]["content"], "first!");
}

#[tokio::test]
async fn empty_comment_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("quiet").await;
    let post_id = app.create_post(&token, "say something").await;

    let res = app
        .post(
            &format!("/api/comments/post/{}", post_id),
            Some(&token),
            json!({ "content": "" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Comment content is required");
}

#[tokio::test]
async fn overlong_comment_reports_length_limit() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("verbose").await;
    let post_id = app.create_post(&token, "go on").await;

    let res = app
        .post(
            &format!("/api/comments/post/{}", post_id),
            Some(&token),
            json!({ "content": "a".repeat(1001) }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Comment must be at most 1000 characters");
}

#[tokio::test]
async fn comment_on_unknown_post_is_not_found() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("lost").await;

    let res = app
        .post(
            "/api/comments/post/65a1b2c3d4e5f60718293a4b",
            Some(&token),
            json!({ "content": "hello?" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "Post not found");
}

#[tokio::test]
async fn comments_are_listed_newest_first() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signup("thread").await;
    let post_id = app.create_post(&token, "thread root").await;
    let uri = format!("/api/comments/post/{}", post_id);

    app.post(&uri, Some(&token), json!({ "content": "one" })).await;
    app.post(&uri, Some(&token), json!({ "content": "two" })).await;

    let res = app.get(&uri, None).await;

    assert_eq!(res.status, StatusCode::OK);
    let comments = res.body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "two");
    assert_eq!(comments[1]["content"], "one");
}

#[tokio::test]
async fn only_author_can_delete_comment() {
    let app = TestApp::spawn().await;
    let (_, owner) = app.signup("host").await;
    let (_, guest) = app.signup("guest").await;
    let post_id = app.create_post(&owner, "open thread").await;

    let created = app
        .post(
            &format!("/api/comments/post/{}", post_id),
            Some(&guest),
            json!({ "content": "mine" }),
        )
        .await;
    let comment_id = created.body["comment"]["id"].as_str().unwrap().to_string();

    let forbidden = app
        .delete(&format!("/api/comments/{}", comment_id), Some(&owner))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["error"], "You can only delete your own comments");

    let deleted = app
        .delete(&format!("/api/comments/{}", comment_id), Some(&guest))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Comment deleted successfully");

    let post = app.get(&format!("/api/posts/{}", post_id), None).await;
    assert_eq!(post.body["post"]["comments"], json!([]));

    let inbox = app.get("/api/notifications", Some(&owner)).await;
    assert_eq!(inbox.body["notifications"], json!([]));

    let again = app
        .delete(&format!("/api/comments/{}", comment_id), Some(&guest))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.body["error"], "Comment not found");
}
