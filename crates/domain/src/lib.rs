//! 聊天后端核心领域模型
//!
//! 包含用户、会话、聊天消息等核心实体，以及相关的值对象和错误类型。

pub mod chat_message;
pub mod errors;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat_message::ChatMessage;
pub use errors::{DomainError, RepositoryError};
pub use user::{Session, User};
pub use value_objects::*;
