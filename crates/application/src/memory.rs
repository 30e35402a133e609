//! 内存实现的仓储与文件存储（用于测试）

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{ChatMessage, RepositoryError, Session, User, UserEmail, UserId};
use tokio::sync::RwLock;

use crate::repository::{ChatMessageRepository, FileStore, UserRepository};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::conflict("email already registered"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update_session(
        &self,
        email: UserEmail,
        session: Option<Session>,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.email == email)
            .ok_or(RepositoryError::NotFound)?;
        let now = chrono::Utc::now();
        match session {
            Some(session) => user.start_session(session, now),
            None => user.end_session(now),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryChatMessageRepository {
    messages: RwLock<Vec<ChatMessage>>,
}

impl MemoryChatMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl ChatMessageRepository for MemoryChatMessageRepository {
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_all(&self) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages = self.messages.read().await.clone();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(file_name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        self.files
            .write()
            .await
            .insert(file_name.to_owned(), bytes.to_vec());
        Ok(())
    }
}
