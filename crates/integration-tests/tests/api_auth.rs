use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::Duration;
use domains::{
    DomainError, MockSessionStore, MockTokenService, TokenService, User, UserRepository,
};
use integration_tests::{AccountSeams, SteppingClock, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_then_login_issue_tokens() {
    let app = TestApp::new();
    let token = app.register("mer", "love").await;
    assert!(!token.is_empty());

    let reply = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "mer", "password": "love"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new();
    app.register("mer", "love").await;

    let wrong = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "mer", "password": "hate"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, json!({"status": 401, "error": "invalid password"}));

    let unknown = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "nobody", "password": "love"})),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(unknown.body, json!({"status": 500, "error": "user not found"}));
}

#[tokio::test]
async fn test_session_store_failure_is_reported_as_session_step() {
    let mut sessions = MockSessionStore::new();
    sessions
        .expect_create()
        .returning(|_| Err(DomainError::Transport("connection reset".to_string())));
    let app = TestApp::with_seams(AccountSeams {
        sessions: Some(Arc::new(sessions)),
        tokens: None,
    });

    let credentials = json!({"username": "mer", "password": "love"});
    let registered = app
        .call(Method::POST, "/api/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(
        registered.body,
        json!({"status": 500, "error": "can't create session"})
    );

    let login = app
        .call(Method::POST, "/api/login", None, Some(credentials))
        .await;
    assert_eq!(login.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(login.body, json!({"status": 500, "error": "can't create session"}));
}

#[tokio::test]
async fn test_signing_failure_is_reported_as_token_step() {
    let mut tokens = MockTokenService::new();
    tokens
        .expect_issue()
        .returning(|_, _| Err(DomainError::Internal("signing key rejected".to_string())));
    let app = TestApp::with_seams(AccountSeams {
        sessions: None,
        tokens: Some(Arc::new(tokens)),
    });

    let reply = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "nobody", "password": "love"})),
        )
        .await;
    assert_eq!(reply.body["error"], "user not found");

    let registered = app
        .call(
            Method::POST,
            "/api/register",
            None,
            Some(json!({"username": "mer", "password": "love"})),
        )
        .await;
    assert_eq!(
        registered.body,
        json!({"status": 500, "error": "can't generate jwt token"})
    );
    assert!(app.store.find_by_login("mer").await.is_ok());
}

#[tokio::test]
async fn test_register_rejects_empty_credentials_and_duplicates() {
    let app = TestApp::new();
    let empty = app
        .call(
            Method::POST,
            "/api/register",
            None,
            Some(json!({"username": "", "password": "love"})),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    app.register("mer", "love").await;
    let again = app
        .call(
            Method::POST,
            "/api/register",
            None,
            Some(json!({"username": "mer", "password": "other"})),
        )
        .await;
    assert_eq!(again.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(again.body["error"], "can't register a new user");
}

#[tokio::test]
async fn test_protected_route_without_token_never_reaches_handler() {
    let app = TestApp::new();
    let reply = app
        .call(
            Method::POST,
            "/api/posts",
            None,
            Some(json!({"category": "music", "type": "text", "title": "t", "text": "b"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body, json!({"status": 401, "error": "No auth"}));

    let listed = app.get("/api/posts/").await;
    assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn test_votes_and_deletes_need_a_token() {
    let app = TestApp::new();
    let token = app.register("mer", "love").await;
    let id = app.create_post(&token, "music", "t").await;

    for (method, uri) in [
        (Method::GET, format!("/api/post/{id}/upvote")),
        (Method::GET, format!("/api/post/{id}/downvote")),
        (Method::GET, format!("/api/post/{id}/unvote")),
        (Method::DELETE, format!("/api/post/{id}")),
    ] {
        let reply = app.call(method, &uri, None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let post = app.get(&format!("/api/post/{id}")).await;
    assert_eq!(post.body["score"], 1);
}

#[tokio::test]
async fn test_open_route_ignores_garbage_authorization() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/posts/")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_bearer_is_rejected() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/post/whatever")
        .header(header::AUTHORIZATION, "Bearer ")
        .body(Body::empty())
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "No auth");
}

#[tokio::test]
async fn test_revoked_session_is_rejected() {
    let app = TestApp::new();
    let token = app.register("mer", "love").await;
    let user = app.store.find_by_login("mer").await.unwrap();

    let revoked = app.accounts.revoke_all(&user.id).await.unwrap();
    assert_eq!(revoked, 1);

    let reply = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&token),
            Some(json!({"category": "music", "type": "text", "title": "t", "text": "b"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "No auth");
}

#[tokio::test]
async fn test_logout_ends_only_that_session() {
    let app = TestApp::new();
    let first = app.register("mer", "love").await;
    let second = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "mer", "password": "love"})),
        )
        .await
        .body["token"]
        .as_str()
        .unwrap()
        .to_string();

    let session = app.accounts.authenticate(&first).await.unwrap();
    app.accounts.logout(&session).await.unwrap();

    assert!(app.accounts.authenticate(&first).await.is_err());
    assert!(app.accounts.authenticate(&second).await.is_ok());
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let app = TestApp::new();
    app.register("mer", "love").await;
    let user = app.store.find_by_login("mer").await.unwrap();

    let session = app.accounts.authenticate(&app.register("bob", "pw").await).await.unwrap();
    let foreign = auth_adapters::JwtTokenService::new(
        b"someone-else",
        Duration::days(90),
        Arc::new(SteppingClock::default()),
    );
    let forged = foreign
        .issue(
            &User {
                password_hash: String::new(),
                ..user
            },
            &session.id,
        )
        .unwrap();

    let reply = app
        .call(Method::DELETE, "/api/post/anything", Some(&forged), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();
    let token = app.register("mer", "love").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["status"], 400);

    let missing_field = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&token),
            Some(json!({"category": "music", "title": "t"})),
        )
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);
}
