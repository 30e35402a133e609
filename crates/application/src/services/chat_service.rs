use std::{collections::HashMap, sync::Arc};

use domain::{ChatMessage, User};

use crate::{
    error::ApplicationError,
    repository::{ChatMessageRepository, UserRepository},
};

/// 附带发送者资料的聊天记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatWithSender {
    pub message: ChatMessage,
    pub sender: User,
}

pub struct ChatServiceDependencies {
    pub message_repository: Arc<dyn ChatMessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 全部聊天记录（按创建时间升序），发送者资料一次批量查询
    pub async fn list_chats(&self) -> Result<Vec<ChatWithSender>, ApplicationError> {
        let messages = self.deps.message_repository.list_all().await?;

        let mut sender_ids: Vec<_> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_by_key(|id| id.0);
        sender_ids.dedup();

        let senders: HashMap<_, _> = self
            .deps
            .user_repository
            .find_many(sender_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let chats = messages
            .into_iter()
            .filter_map(|message| match senders.get(&message.sender_id) {
                Some(sender) => Some(ChatWithSender {
                    sender: sender.clone(),
                    message,
                }),
                None => {
                    tracing::warn!(message_id = %message.id, sender_id = %message.sender_id, "聊天记录的发送者不存在，已跳过");
                    None
                }
            })
            .collect();
        Ok(chats)
    }
}
