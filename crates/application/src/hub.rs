//! 聊天广播中心
//!
//! 负责把客户端加入房间、持久化收到的聊天事件，并在持久化成功后
//! 把存储后的记录扇出给房间内所有成员（包括发送者）。
//!
//! 房间成员表由一把 `RwLock` 保护：连接与断开持有写锁，广播持有读锁，
//! 因此已被移除的客户端不会再收到任何消息。持久化在锁外进行，
//! 慢存储只会阻塞触发它的那一次调用。

use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use domain::{
    ChatMessage, DomainError, MessageBody, MessageId, MessageType, Timestamp, UserId,
};
use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::{
    error::ApplicationError,
    repository::{ChatMessageRepository, UserRepository},
};

pub const DEFAULT_ROOM: &str = "chat";

/// 单个连接的标识，仅在连接存续期间有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 每个客户端一个无界发件箱，由网关负责写回套接字。
pub type Outbox = mpsc::UnboundedSender<ChatMessage>;

/// 客户端发来的 `input_message` 事件
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMessage {
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    pub now_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub message_id: MessageId,
}

#[derive(Default)]
struct Rooms {
    members: HashMap<String, HashMap<ClientId, Outbox>>,
    placement: HashMap<ClientId, String>,
}

impl Rooms {
    fn remove(&mut self, client: ClientId) -> Option<String> {
        let room = self.placement.remove(&client)?;
        if let Some(members) = self.members.get_mut(&room) {
            members.remove(&client);
            if members.is_empty() {
                self.members.remove(&room);
            }
        }
        Some(room)
    }
}

pub struct ChatHubDependencies {
    pub message_repository: Arc<dyn ChatMessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
}

pub struct ChatHub {
    deps: ChatHubDependencies,
    rooms: RwLock<Rooms>,
}

impl ChatHub {
    pub fn new(deps: ChatHubDependencies) -> Self {
        Self {
            deps,
            rooms: RwLock::new(Rooms::default()),
        }
    }

    /// 加入默认房间；已在其他房间时先移出，保证每个客户端至多属于一个房间。
    pub async fn on_connect(&self, client: ClientId, outbox: Outbox) -> String {
        let mut rooms = self.rooms.write().await;
        rooms.remove(client);
        rooms
            .members
            .entry(DEFAULT_ROOM.to_owned())
            .or_default()
            .insert(client, outbox);
        rooms.placement.insert(client, DEFAULT_ROOM.to_owned());
        tracing::debug!(client_id = %client, room = DEFAULT_ROOM, "客户端加入房间");
        DEFAULT_ROOM.to_owned()
    }

    /// 先持久化，成功后再广播；持久化失败时不广播。
    pub async fn on_message(
        &self,
        client: ClientId,
        event: InputMessage,
    ) -> Result<Ack, ApplicationError> {
        let sender_id = UserId::parse(&event.user_id)?;
        let created_at = parse_client_timestamp(&event.now_time)?;
        let body = MessageBody::new(event.message)?;
        let message_type = MessageType::parse(event.message_type.as_deref())?;

        if self
            .deps
            .user_repository
            .find_by_id(sender_id)
            .await?
            .is_none()
        {
            return Err(DomainError::malformed_event("userId does not name a registered user").into());
        }

        let message = ChatMessage::new(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            body,
            message_type,
            created_at,
        );
        let saved = self
            .deps
            .message_repository
            .save(message)
            .await
            .map_err(|err| {
                tracing::error!(client_id = %client, error = %err, "聊天消息持久化失败");
                err
            })?;

        let delivered = self.broadcast(client, &saved).await;
        tracing::debug!(message_id = %saved.id, delivered, "聊天消息已广播");

        Ok(Ack { message_id: saved.id })
    }

    /// 移出所在房间，不通知其他成员。
    pub async fn on_disconnect(&self, client: ClientId) {
        if let Some(room) = self.rooms.write().await.remove(client) {
            tracing::debug!(client_id = %client, room = %room, "客户端离开房间");
        }
    }

    pub async fn member_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .await
            .members
            .get(room)
            .map_or(0, HashMap::len)
    }

    pub async fn room_of(&self, client: ClientId) -> Option<String> {
        self.rooms.read().await.placement.get(&client).cloned()
    }

    async fn broadcast(&self, from: ClientId, message: &ChatMessage) -> usize {
        let rooms = self.rooms.read().await;
        // 未加入房间的客户端发出的消息投递到默认房间
        let room = rooms
            .placement
            .get(&from)
            .map_or(DEFAULT_ROOM, String::as_str);

        let Some(members) = rooms.members.get(room) else {
            return 0;
        };
        let mut delivered = 0;
        for (client, outbox) in members {
            if outbox.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(client_id = %client, "发件箱已关闭，跳过");
            }
        }
        delivered
    }
}

/// 接受 RFC 3339 或 `YYYY-MM-DD HH:MM:SS`（按 UTC 解释）
pub fn parse_client_timestamp(raw: &str) -> Result<Timestamp, DomainError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| DomainError::malformed_event("nowTime is not a valid timestamp"))
}
