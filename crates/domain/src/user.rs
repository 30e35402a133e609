use serde::{Deserialize, Serialize};

use crate::value_objects::{DisplayName, PasswordHash, Timestamp, UserEmail, UserId};

/// 持久化在用户记录上的会话：令牌与过期时间总是同时设置或同时清空。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: DisplayName,
    pub lastname: String,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub session: Option<Session>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        name: DisplayName,
        lastname: impl Into<String>,
        email: UserEmail,
        password: PasswordHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            lastname: lastname.into().trim().to_owned(),
            email,
            password,
            avatar_url: None,
            session: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 覆盖任何已有会话。
    pub fn start_session(&mut self, session: Session, now: Timestamp) {
        self.session = Some(session);
        self.updated_at = now;
    }

    pub fn end_session(&mut self, now: Timestamp) {
        self.session = None;
        self.updated_at = now;
    }

    /// 判断给定的令牌/过期时间是否正是当前持久化的会话。
    pub fn holds_session(&self, token: &str, expires_at: Timestamp) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.token == token && s.expires_at == expires_at)
    }

    /// 头像地址，未设置时使用按 id 生成的默认头像。
    pub fn avatar_or_default(&self) -> String {
        self.avatar_url
            .clone()
            .unwrap_or_else(|| format!("https://i.pravatar.cc/100?u={}", self.id))
    }
}
