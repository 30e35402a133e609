//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：凭据存储、会话令牌、聊天广播中心、
//! 聊天记录查询与文件上传，以及对外部适配器（密码哈希、仓储、文件存储）的抽象。

pub mod clock;
pub mod deadline;
pub mod error;
pub mod hub;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod password;
pub mod repository;
pub mod services;
pub mod uploads;

pub use clock::{Clock, SystemClock};
pub use deadline::{with_deadline, Deadline, PERSISTENCE_TIMEOUT};
pub use error::{ApplicationError, AuthError};
pub use hub::{Ack, ChatHub, ChatHubDependencies, ClientId, InputMessage, Outbox, DEFAULT_ROOM};
pub use password::{PasswordHasher, PasswordHasherError};
pub use repository::{ChatMessageRepository, FileStore, UserRepository};
pub use services::{
    ChatService, ChatServiceDependencies, ChatWithSender, IssuedToken, RegisterUserRequest,
    TokenService, TokenServiceDependencies, UserService, UserServiceDependencies,
    SESSION_MAX_AGE, TOKEN_LIFETIME,
};
pub use uploads::{StoredUpload, UploadService, ALLOWED_CONTENT_TYPES};
