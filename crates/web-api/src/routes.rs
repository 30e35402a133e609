use std::{convert::Infallible, time::Duration};

use application::{ApplicationError, AuthError, RegisterUserRequest};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State, WebSocketUpgrade},
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use validator::Validate;

use crate::{
    auth::{require_auth, AuthUser},
    dto::{
        AuthStatus, ChatDto, LoginFailure, LoginSuccess, SuccessResponse, UploadResponse,
    },
    error::ApiError,
    state::AppState,
    ws_connection::WebSocketConnection,
};

#[derive(Debug, Deserialize, Validate)]
struct RegisterPayload {
    #[validate(length(min = 1, message = "is required"))]
    name: String,
    #[validate(email(message = "must be a valid email address"))]
    email: String,
    #[serde(default)]
    lastname: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

pub fn router(state: AppState) -> Router {
    let uploads_dir = state.settings.uploads_dir.clone();
    let public_prefix = format!("/{}", state.settings.public_prefix.trim_matches('/'));

    Router::new()
        .route("/", get(status_probe))
        .route("/health", get(health))
        .route("/ws", get(websocket_upgrade))
        .nest("/api", api_routes(&state))
        .nest_service(&public_prefix, ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users/auth", get(auth_status))
        .route("/users/logout", get(logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/users/login", post(login))
        .route("/users/register", post(register))
        .route("/chats", get(list_chats))
        .route(
            "/chats/upload",
            post(upload_file)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.settings.max_upload_bytes)),
        )
        .merge(protected)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .max_age(Duration::from_secs(300))
}

async fn status_probe() -> &'static str {
    "ok"
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    state
        .user_service
        .register(RegisterUserRequest {
            name: payload.name,
            lastname: payload.lastname,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// 现有客户端依赖 `loginSuccess` 字段判断结果，凭据错误时仍返回 200
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "登录请求体无效");
            return Ok(Json(LoginFailure::new(rejection.body_text())).into_response());
        }
    };

    let user = match state
        .user_service
        .authenticate(&payload.email, &payload.password)
        .await
    {
        Ok(user) => user,
        Err(ApplicationError::Auth(AuthError::InvalidCredentials)) => {
            return Ok(Json(LoginFailure::new("Auth failed, email or password incorrect"))
                .into_response());
        }
        Err(err) => return Err(err.into()),
    };

    let issued = state.token_service.issue(&user.email).await?;
    tracing::info!(user_id = %user.id, "用户登录");
    Ok(Json(LoginSuccess::new(&user, issued)).into_response())
}

async fn auth_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AuthStatus>, ApiError> {
    let user = state.user_service.profile(&auth.email).await?;
    Ok(Json(AuthStatus::from(&user)))
}

async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.token_service.revoke(&auth.email).await?;
    tracing::info!(email = %auth.email, "用户登出");
    Ok(Json(SuccessResponse { success: true }))
}

async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<ChatDto>>, ApiError> {
    let chats = state.chat_service.list_chats().await?;
    Ok(Json(chats.iter().map(ChatDto::from).collect()))
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::new(err.status(), "INVALID_MULTIPART", err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::new(err.status(), "INVALID_MULTIPART", err.body_text()))?;

        let stored = state.upload_service.upload(&bytes).await?;
        return Ok(Json(UploadResponse {
            success: true,
            url: stored.url,
            file_name: stored.file_name,
            content_type: stored.content_type,
        }));
    }

    Err(ApiError::validation("file: multipart field is required"))
}

async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state).run())
}
