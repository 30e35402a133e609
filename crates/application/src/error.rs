use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::password::PasswordHasherError;

/// 认证与会话相关的失败类型
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("token revoked")]
    Revoked,
    #[error("authentication required")]
    Unauthenticated,
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("unsupported media type: {}", detected.as_deref().unwrap_or("unknown"))]
    UnsupportedMediaType { detected: Option<String> },
    #[error("token signing error: {0}")]
    TokenSigning(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}

impl ApplicationError {
    /// 调用方可重试的失败（持久化超时）
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApplicationError::Repository(RepositoryError::Timeout))
    }
}
