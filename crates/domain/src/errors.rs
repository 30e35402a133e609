//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 输入校验失败
    #[error("invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("user with email {email} already exists")]
    UserAlreadyExists { email: String },

    #[error("user not found")]
    UserNotFound,

    /// 客户端实时事件格式错误
    #[error("malformed event: {reason}")]
    MalformedEvent { reason: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn user_already_exists(email: impl Into<String>) -> Self {
        Self::UserAlreadyExists {
            email: email.into(),
        }
    }

    pub fn malformed_event(reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            reason: reason.into(),
        }
    }
}

/// 存储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    /// 超过单次调用的截止时间
    #[error("storage call timed out")]
    Timeout,
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}
