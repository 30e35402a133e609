mod support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Duration;
use serde_json::json;
use support::{multipart_upload, setup_test_app};

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

#[tokio::test]
async fn probes_answer_without_auth() {
    let app = setup_test_app();

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = setup_test_app();

    assert_eq!(
        app.register("Alice", "alice@example.com", "password123").await,
        StatusCode::NO_CONTENT
    );

    let (status, body) = app
        .post_json(
            "/api/users/register",
            json!({
                "name": "Alice",
                "email": "ALICE@example.com",
                "password": "password123",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_EMAIL");

    assert_eq!(
        app.register("Bob", "bob@example.com", "short").await,
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        app.register("Bob", "not-an-email", "password123").await,
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn login_reports_success_and_failure_in_body() {
    let app = setup_test_app();
    app.register("Alice", "alice@example.com", "password123").await;

    let ok = app.login("alice@example.com", "password123").await;
    assert_eq!(ok["loginSuccess"], true);
    assert_eq!(ok["email"], "alice@example.com");
    assert_eq!(ok["name"], "Alice");
    assert!(ok["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(ok["max_session_age_secs"], 14 * 24 * 60 * 60);

    let wrong = app.login("alice@example.com", "wrong-password").await;
    assert_eq!(wrong["loginSuccess"], false);
    assert!(wrong.get("token").is_none());

    let unknown = app.login("nobody@example.com", "password123").await;
    assert_eq!(unknown["loginSuccess"], false);
    assert_eq!(unknown["message"], wrong["message"]);
}

#[tokio::test]
async fn broken_login_body_still_answers_login_failure() {
    let app = setup_test_app();

    let (status, body) = app
        .post_json("/api/users/login", json!({ "email": "alice@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loginSuccess"], false);
    assert!(body["message"].as_str().is_some_and(|m| m.contains("password")));

    let (status, body) = app.post_raw("/api/users/login", "not json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loginSuccess"], false);
}

#[tokio::test]
async fn broken_register_body_is_a_structured_error() {
    let app = setup_test_app();

    let (status, body) = app.post_raw("/api/users/register", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
    assert!(body["message"].is_string());

    let (status, body) = app
        .post_json("/api/users/register", json!({ "name": "Alice" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer() {
    let app = setup_test_app();

    let (status, body) = app.get("/api/users/auth", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, body) = app.get("/api/users/auth", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");

    let (status, _) = app.get("/api/users/logout", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_status_then_logout_revokes_the_token() {
    let app = setup_test_app();
    let (user_id, token) = app.signed_in_user("Alice", "alice@example.com").await;

    let (status, body) = app.get("/api/users/auth", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAuth"], true);
    assert_eq!(body["userId"], user_id.as_str());

    let (status, body) = app.get("/api/users/logout", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.get("/api/users/auth", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn new_login_supersedes_the_previous_token() {
    let app = setup_test_app();
    let (_, first) = app.signed_in_user("Alice", "alice@example.com").await;

    app.clock.advance(Duration::seconds(2));
    let second = app.login("alice@example.com", "password123").await["token"]
        .as_str()
        .unwrap()
        .to_owned();

    let (status, body) = app.get("/api/users/auth", Some(&first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_REVOKED");

    let (status, _) = app.get("/api/users/auth", Some(&second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn token_expires_after_its_lifetime() {
    let app = setup_test_app();
    let (_, token) = app.signed_in_user("Alice", "alice@example.com").await;

    app.clock.advance(Duration::minutes(61));

    let (status, body) = app.get("/api/users/auth", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn chat_list_starts_empty() {
    let app = setup_test_app();

    let (status, body) = app.get("/api/chats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn uploaded_image_is_served_under_files() {
    let app = setup_test_app();

    let (status, body) = app.send(multipart_upload("file", "pic.bin", PNG)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["content_type"], "image/png");

    let url = body["url"].as_str().unwrap();
    let file_name = body["file_name"].as_str().unwrap();
    assert_eq!(url, format!("files/{file_name}"));
    assert!(file_name.ends_with(".png"));
    assert_eq!(file_name.len(), 32 + ".png".len());

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::get(format!("/{url}")).body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(served.as_ref(), PNG);
}

#[tokio::test]
async fn upload_rejects_unsupported_content() {
    let app = setup_test_app();

    let (status, body) = app
        .send(multipart_upload("file", "pic.png", b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n"))
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");

    let stored = std::fs::read_dir(&app.uploads_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn upload_requires_the_file_field() {
    let app = setup_test_app();

    let (status, body) = app.send(multipart_upload("avatar", "pic.png", PNG)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn storage_failure_behind_the_bearer_is_not_reported_as_401() {
    use std::sync::Arc;

    use application::{
        memory::{MemoryChatMessageRepository, MemoryFileStore},
        repository::MockUserRepository,
        SystemClock,
    };
    use domain::{RepositoryError, UserEmail};
    use infrastructure::BcryptPasswordHasher;
    use web_api::{router, AppState, StateDependencies};

    let mut users = MockUserRepository::new();
    users.expect_update_session().returning(|_, _| Ok(()));
    users
        .expect_find_by_email()
        .returning(|_| Err(RepositoryError::Timeout));

    let state = AppState::assemble(
        StateDependencies {
            user_repository: Arc::new(users),
            message_repository: Arc::new(MemoryChatMessageRepository::new()),
            file_store: Arc::new(MemoryFileStore::new()),
            password_hasher: Arc::new(BcryptPasswordHasher::new(Some(4))),
            clock: Arc::new(SystemClock),
        },
        &config::AppConfig::default(),
    );
    let email = UserEmail::parse("alice@example.com").unwrap();
    let issued = state.token_service.issue(&email).await.unwrap();

    let response = tower::ServiceExt::oneshot(
        router(state),
        Request::get("/api/users/auth")
            .header("authorization", format!("Bearer {}", issued.token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "PERSISTENCE_TIMEOUT");
}
