#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use application::{
    clock::ManualClock,
    memory::{MemoryChatMessageRepository, MemoryUserRepository},
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use config::AppConfig;
use infrastructure::{BcryptPasswordHasher, LocalFileStore};
use serde_json::{json, Value};
use tower::ServiceExt;
use web_api::{router, AppState, StateDependencies};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub messages: Arc<MemoryChatMessageRepository>,
    pub uploads_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads_dir);
    }
}

/// 内存仓储 + 本地临时目录 + 低成本 bcrypt
pub fn setup_test_app() -> TestApp {
    let uploads_dir =
        std::env::temp_dir().join(format!("suchat-web-{}", uuid::Uuid::new_v4()));

    let mut config = AppConfig::default();
    config.uploads.dir = uploads_dir.to_string_lossy().into_owned();
    config.uploads.max_upload_mb = 1;

    let now = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap();
    let clock = Arc::new(ManualClock::new(now));
    let messages = Arc::new(MemoryChatMessageRepository::new());

    let state = AppState::assemble(
        StateDependencies {
            user_repository: Arc::new(MemoryUserRepository::new()),
            message_repository: messages.clone(),
            file_store: Arc::new(LocalFileStore::new(&uploads_dir)),
            password_hasher: Arc::new(BcryptPasswordHasher::new(Some(4))),
            clock: clock.clone(),
        },
        &config,
    );

    TestApp {
        router: router(state.clone()),
        state,
        clock,
        messages,
        uploads_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_raw(&self, uri: &str, body: &'static str) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::get(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> StatusCode {
        let (status, _) = self
            .post_json(
                "/api/users/register",
                json!({
                    "name": name,
                    "lastname": "Tester",
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        status
    }

    pub async fn login(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/users/login",
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// 注册并登录，返回 (userId, token)
    pub async fn signed_in_user(&self, name: &str, email: &str) -> (String, String) {
        assert_eq!(
            self.register(name, email, "password123").await,
            StatusCode::NO_CONTENT
        );
        let body = self.login(email, "password123").await;
        (
            body["userId"].as_str().unwrap().to_owned(),
            body["token"].as_str().unwrap().to_owned(),
        )
    }
}

pub fn multipart_upload(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "suchat-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::post("/api/chats/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// 在随机端口上启动服务，返回地址与关闭信号
pub async fn spawn_server(router: Router) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("server error");
    });

    (addr, shutdown_tx)
}
