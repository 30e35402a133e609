use application::{ApplicationError, AuthError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }

    pub fn message(&self) -> &str {
        &self.body.message
    }

    pub fn into_body(self) -> ErrorBody {
        self.body
    }
}

/// 字段缺失或类型不符按校验错误处理，其余（语法错误、缺少 Content-Type）保留原状态码
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => Self::validation(err.body_text()),
            other => Self::new(other.status(), "INVALID_BODY", other.body_text()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let code = match error {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::Revoked => "TOKEN_REVOKED",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
        };
        ApiError::new(StatusCode::UNAUTHORIZED, code, error.to_string())
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use ApplicationError as AppErr;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, message }) => {
                ApiError::validation(format!("{field}: {message}"))
            }
            AppErr::Domain(err @ DomainError::UserAlreadyExists { .. }) => {
                ApiError::new(StatusCode::BAD_REQUEST, "DUPLICATE_EMAIL", err.to_string())
            }
            AppErr::Domain(DomainError::UserNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            AppErr::Domain(err @ DomainError::MalformedEvent { .. }) => {
                ApiError::new(StatusCode::BAD_REQUEST, "MALFORMED_EVENT", err.to_string())
            }
            AppErr::Auth(err) => err.into(),
            AppErr::UnsupportedMediaType { detected } => ApiError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_TYPE",
                match detected {
                    Some(mime) => format!("{mime} is not allowed, expected jpeg, gif, png or mp4"),
                    None => "unrecognised file type, expected jpeg, gif, png or mp4".to_owned(),
                },
            ),
            AppErr::Repository(repo_err) => match repo_err {
                RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                RepositoryError::Conflict { message } => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", message)
                }
                RepositoryError::Timeout => {
                    tracing::error!("持久化调用超时");
                    ApiError::new(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "PERSISTENCE_TIMEOUT",
                        "storage did not respond in time, please retry",
                    )
                }
                RepositoryError::Storage { message } => {
                    tracing::error!(error = %message, "持久化失败");
                    ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PERSISTENCE_ERROR",
                        "storage failure",
                    )
                }
            },
            AppErr::Password(err) => {
                tracing::error!(error = %err, "密码哈希失败");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PASSWORD_ERROR",
                    "password processing failed",
                )
            }
            AppErr::TokenSigning(message) => {
                tracing::error!(error = %message, "令牌签发失败");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TOKEN_ERROR",
                    "could not issue token",
                )
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_owned());
                format!("{field}: {reason}")
            })
            .collect();
        fields.sort();
        ApiError::validation(fields.join(", "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
