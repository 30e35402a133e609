//! 持久化调用的单次截止时间
//!
//! 每个存储调用都有固定的超时；超时后以 `RepositoryError::Timeout` 失败，
//! 不会无限期阻塞调用方。

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use domain::{ChatMessage, RepositoryError, Session, User, UserEmail, UserId};

use crate::repository::{ChatMessageRepository, FileStore, UserRepository};

/// 默认的单次持久化超时
pub const PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn with_deadline<T, F>(timeout: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "存储调用超时");
            Err(RepositoryError::Timeout)
        }
    }
}

/// 给任意仓储加上单次调用超时的包装
pub struct Deadline<R: ?Sized> {
    inner: Arc<R>,
    timeout: Duration,
}

impl<R: ?Sized> Deadline<R> {
    pub fn new(inner: Arc<R>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl UserRepository for Deadline<dyn UserRepository> {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        with_deadline(self.timeout, self.inner.create(user)).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        with_deadline(self.timeout, self.inner.find_by_id(id)).await
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        with_deadline(self.timeout, self.inner.find_by_email(email)).await
    }

    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<User>, RepositoryError> {
        with_deadline(self.timeout, self.inner.find_many(ids)).await
    }

    async fn update_session(
        &self,
        email: UserEmail,
        session: Option<Session>,
    ) -> Result<(), RepositoryError> {
        with_deadline(self.timeout, self.inner.update_session(email, session)).await
    }
}

#[async_trait]
impl ChatMessageRepository for Deadline<dyn ChatMessageRepository> {
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        with_deadline(self.timeout, self.inner.save(message)).await
    }

    async fn list_all(&self) -> Result<Vec<ChatMessage>, RepositoryError> {
        with_deadline(self.timeout, self.inner.list_all()).await
    }
}

#[async_trait]
impl FileStore for Deadline<dyn FileStore> {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        with_deadline(self.timeout, self.inner.put(file_name, bytes)).await
    }
}
