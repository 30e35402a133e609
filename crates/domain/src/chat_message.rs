use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageBody, MessageId, MessageType, Timestamp, UserId};

/// 已持久化的聊天记录，创建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub body: MessageBody,
    pub message_type: MessageType,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        body: MessageBody,
        message_type: MessageType,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            body,
            message_type,
            created_at,
        }
    }
}
