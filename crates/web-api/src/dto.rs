//! 对外的 JSON 形状（字段名沿用现有前端客户端的约定）

use application::{ChatWithSender, IssuedToken};
use chrono::{DateTime, Utc};
use domain::{ChatMessage, User};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct LoginSuccess {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub lastname: String,
    pub avatar_url: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub max_session_age_secs: i64,
    #[serde(rename = "loginSuccess")]
    pub login_success: bool,
}

impl LoginSuccess {
    pub fn new(user: &User, issued: IssuedToken) -> Self {
        Self {
            user_id: user.id.into(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            lastname: user.lastname.clone(),
            avatar_url: user.avatar_or_default(),
            token: issued.token,
            expires_at: issued.expires_at,
            max_session_age_secs: issued.max_session_age.num_seconds(),
            login_success: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginFailure {
    #[serde(rename = "loginSuccess")]
    pub login_success: bool,
    pub message: String,
}

impl LoginFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            login_success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub lastname: String,
    pub avatar_url: String,
    #[serde(rename = "isAuth")]
    pub is_auth: bool,
    pub error: bool,
}

impl From<&User> for AuthStatus {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.into(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            lastname: user.lastname.clone(),
            avatar_url: user.avatar_or_default(),
            is_auth: true,
            error: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SenderProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub lastname: String,
    pub avatar_url: String,
}

impl From<&User> for SenderProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.into(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            lastname: user.lastname.clone(),
            avatar_url: user.avatar_or_default(),
        }
    }
}

/// 列表接口中的聊天记录，发送者展开为资料
#[derive(Debug, Serialize)]
pub struct ChatDto {
    pub id: Uuid,
    pub sender: SenderProfile,
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ChatWithSender> for ChatDto {
    fn from(chat: &ChatWithSender) -> Self {
        Self {
            id: chat.message.id.into(),
            sender: SenderProfile::from(&chat.sender),
            message: chat.message.body.as_str().to_owned(),
            message_type: chat.message.message_type.to_string(),
            created_at: chat.message.created_at,
        }
    }
}

/// 实时推送的聊天记录，发送者只给出 id
#[derive(Debug, Serialize)]
pub struct ChatMessageDto {
    pub id: Uuid,
    pub sender: Uuid,
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.into(),
            sender: message.sender_id.into(),
            message: message.body.as_str().to_owned(),
            message_type: message.message_type.to_string(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
