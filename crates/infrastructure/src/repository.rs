use std::time::Duration;

use application::{ChatMessageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ChatMessage, DisplayName, MessageBody, MessageId, MessageType, PasswordHash, RepositoryError,
    Session, User, UserEmail, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::conflict(db.message().to_owned());
        }
    }
    tracing::error!(error = %err, "数据库调用失败");
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

const USER_COLUMNS: &str = "id, name, lastname, email, password_hash, avatar_url, \
                            session_token, session_expires_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    lastname: String,
    email: String,
    password_hash: String,
    avatar_url: Option<String>,
    session_token: Option<String>,
    session_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let name = DisplayName::parse(value.name).map_err(|err| invalid_data(err.to_string()))?;
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;
        let session = match (value.session_token, value.session_expires_at) {
            (Some(token), Some(expires_at)) => Some(Session { token, expires_at }),
            (None, None) => None,
            _ => return Err(invalid_data("session token and expiry must be set together")),
        };

        Ok(User {
            id: UserId::from(value.id),
            name,
            lastname: value.lastname,
            email,
            password,
            avatar_url: value.avatar_url,
            session,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChatRecord {
    id: Uuid,
    sender_id: Uuid,
    message: String,
    #[sqlx(rename = "type")]
    message_type: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChatRecord> for ChatMessage {
    type Error = RepositoryError;

    fn try_from(value: ChatRecord) -> Result<Self, Self::Error> {
        let body = MessageBody::new(value.message).map_err(|err| invalid_data(err.to_string()))?;
        let message_type = MessageType::parse(Some(&value.message_type))
            .map_err(|err| invalid_data(err.to_string()))?;
        Ok(ChatMessage::new(
            MessageId::from(value.id),
            UserId::from(value.sender_id),
            body,
            message_type,
            value.created_at,
        ))
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let (session_token, session_expires_at) = match &user.session {
            Some(session) => (Some(session.token.as_str()), Some(session.expires_at)),
            None => (None, None),
        };
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (id, name, lastname, email, password_hash, avatar_url,
                               session_token, session_expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::from(user.id))
        .bind(user.name.as_str())
        .bind(user.lastname.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.avatar_url.as_deref())
        .bind(session_token)
        .bind(session_expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.into_iter().map(Uuid::from).collect();
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn update_session(
        &self,
        email: UserEmail,
        session: Option<Session>,
    ) -> Result<(), RepositoryError> {
        let (token, expires_at) = match session {
            Some(Session { token, expires_at }) => (Some(token), Some(expires_at)),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE users
            SET session_token = $2, session_expires_at = $3, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgChatMessageRepository {
    pool: PgPool,
}

impl PgChatMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatMessageRepository for PgChatMessageRepository {
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let record = sqlx::query_as::<_, ChatRecord>(
            r#"
            INSERT INTO chats (id, sender_id, message, type, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sender_id, message, type, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.body.as_str())
        .bind(message.message_type.as_str())
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        ChatMessage::try_from(record)
    }

    async fn list_all(&self) -> Result<Vec<ChatMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, ChatRecord>(
            r#"
            SELECT id, sender_id, message, type, created_at
            FROM chats
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(ChatMessage::try_from).collect()
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}
