use async_trait::async_trait;
use domain::{ChatMessage, RepositoryError, Session, User, UserEmail, UserId};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 邮箱重复时返回 `RepositoryError::Conflict`
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;
    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<User>, RepositoryError>;
    /// 同时写入（或清空）令牌与过期时间；用户不存在时返回 `NotFound`
    async fn update_session(
        &self,
        email: UserEmail,
        session: Option<Session>,
    ) -> Result<(), RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// 写入后读回存储中的记录
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError>;
    /// 按创建时间升序
    async fn list_all(&self) -> Result<Vec<ChatMessage>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), RepositoryError>;
}
