use application::{ClientId, InputMessage};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::ChatMessage;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{dto::ChatMessageDto, error::ApiError, state::AppState};

/// 客户端帧：`{"event": <name>, "data": <payload>}`
#[derive(Debug, Deserialize)]
struct ClientEnvelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ServerEnvelope<T> {
    event: &'static str,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    code: &'static str,
    message: String,
}

impl From<ApiError> for ErrorPayload {
    fn from(error: ApiError) -> Self {
        let body = error.into_body();
        Self {
            code: body.code,
            message: body.message,
        }
    }
}

/// 单个 WebSocket 连接
///
/// 接收循环按顺序处理同一客户端的事件，因此同一客户端的消息
/// 按持久化完成的顺序广播。发件箱与直接回复由独立的发送任务写回套接字。
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    client_id: ClientId,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState) -> Self {
        let client_id = ClientId::generate();
        tracing::info!(client_id = %client_id, "WebSocket 连接已建立");
        Self {
            socket,
            state,
            client_id,
        }
    }

    pub async fn run(self) {
        let Self {
            socket,
            state,
            client_id,
        } = self;
        let (mut sender, mut incoming) = socket.split();

        let (outbox, mut broadcasts) = mpsc::unbounded_channel::<ChatMessage>();
        let (reply_tx, mut replies) = mpsc::unbounded_channel::<String>();

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let mut send_task = tokio::spawn(async move {
            loop {
                let text = tokio::select! {
                    Some(message) = broadcasts.recv() => {
                        match encode("output_message", ChatMessageDto::from(&message)) {
                            Some(text) => text,
                            None => continue,
                        }
                    }
                    Some(text) = replies.recv() => text,
                    else => break,
                };
                if sender.send(WsMessage::Text(text.into())).await.is_err() {
                    tracing::debug!("WebSocket 写入失败，结束发送任务");
                    break;
                }
            }
        });

        let mut recv_task = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Some(Ok(frame)) = incoming.next().await {
                    match frame {
                        WsMessage::Text(text) => {
                            if let Err(error) =
                                handle_event(&state, client_id, &outbox, text.as_str()).await
                            {
                                let reply = encode("error", ErrorPayload::from(error));
                                if let Some(reply) = reply {
                                    if reply_tx.send(reply).is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        WsMessage::Close(_) => break,
                        // Ping 由底层自动回复 Pong
                        _ => {}
                    }
                }
            })
        };

        // 等待任意一个任务完成（连接断开）
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        state.hub.on_disconnect(client_id).await;
        tracing::info!(client_id = %client_id, "WebSocket 连接已关闭");
    }
}

async fn handle_event(
    state: &AppState,
    client_id: ClientId,
    outbox: &mpsc::UnboundedSender<ChatMessage>,
    text: &str,
) -> Result<(), ApiError> {
    let envelope: ClientEnvelope = serde_json::from_str(text)
        .map_err(|err| ApiError::bad_request(format!("invalid frame: {err}")))?;

    match envelope.event.as_str() {
        "connect" => {
            let room = state.hub.on_connect(client_id, outbox.clone()).await;
            tracing::debug!(client_id = %client_id, room = %room, "客户端请求加入房间");
            Ok(())
        }
        "input_message" => {
            let input: InputMessage = serde_json::from_value(envelope.data).map_err(|err| {
                ApiError::from(application::ApplicationError::from(
                    domain::DomainError::malformed_event(err.to_string()),
                ))
            })?;
            let ack = state.hub.on_message(client_id, input).await?;
            tracing::debug!(client_id = %client_id, message_id = %ack.message_id, "聊天消息已确认");
            Ok(())
        }
        other => Err(ApiError::bad_request(format!("unknown event: {other}"))),
    }
}

fn encode<T: Serialize>(event: &'static str, data: T) -> Option<String> {
    serde_json::to_string(&ServerEnvelope { event, data })
        .map_err(|err| tracing::warn!(error = %err, "failed to serialize websocket payload"))
        .ok()
}
