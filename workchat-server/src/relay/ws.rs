use workchat_common::db::{self, DaoError, DbThreadPool};
use workchat_common::models::message::{MessageRecipient, NewMessage};

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{Message, Session};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromQuery;
use crate::relay::{ConnectionRegistry, PushConnection, PushError};

struct WsConnection {
    session: Session,
}

#[async_trait]
impl PushConnection for WsConnection {
    async fn push(&self, payload: &str) -> Result<(), PushError> {
        self.session
            .clone()
            .text(String::from(payload))
            .await
            .map_err(|_| PushError::Gone)
    }
}

pub async fn connect(
    req: HttpRequest,
    body: web::Payload,
    token: VerifiedToken<FromQuery>,
    db_thread_pool: web::Data<DbThreadPool>,
    registry: web::Data<ConnectionRegistry>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut stream) = actix_ws::handle(&req, body)?;

    let user_id = token.claims.user_id;
    let connection_id = registry.register(
        user_id,
        Arc::new(WsConnection {
            session: session.clone(),
        }),
    );

    actix_web::rt::spawn(async move {
        let mut close_reason = None;

        while let Some(message) = stream.recv().await {
            match message {
                Ok(Message::Text(text)) => {
                    let reply =
                        dispatch(&text, user_id, connection_id, &db_thread_pool, &registry).await;

                    if session.text(reply.to_string()).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Ping(bytes)) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(reason)) => {
                    close_reason = reason;
                    break;
                }
                Ok(_) => (),
                Err(e) => {
                    log::warn!("WebSocket protocol error on connection {connection_id}: {e}");
                    break;
                }
            }
        }

        registry.unregister(connection_id);
        let _ = session.close(close_reason).await;
    });

    Ok(response)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundFrame {
    DirectMessage { receiver_id: i32, content: String },
    GroupMessage { department_id: i32, content: String },
    Broadcast { content: String },
    TypingIndicator { receiver_id: i32, is_typing: bool },
    ReadReceipt { message_id: i32 },
}

#[derive(Debug)]
enum DispatchError {
    NotMember,
    RecipientNotFound,
    MessageNotFound,
    Dao(DaoError),
    ThreadPool,
}

impl From<DaoError> for DispatchError {
    fn from(e: DaoError) -> Self {
        if e.is_foreign_key_violation() {
            DispatchError::RecipientNotFound
        } else {
            DispatchError::Dao(e)
        }
    }
}

impl From<actix_web::error::BlockingError> for DispatchError {
    fn from(_err: actix_web::error::BlockingError) -> Self {
        DispatchError::ThreadPool
    }
}

impl DispatchError {
    fn reply(&self) -> Value {
        let message = match self {
            DispatchError::NotMember => "User not authorized for this department",
            DispatchError::RecipientNotFound => "Recipient not found",
            DispatchError::MessageNotFound => "Message not found",
            DispatchError::Dao(e) => {
                log::error!("{e}");
                "Failed to process message"
            }
            DispatchError::ThreadPool => "Failed to process message",
        };

        json!({ "error": message })
    }
}

/// Handles one inbound text frame and returns the reply for the sending connection.
async fn dispatch(
    text: &str,
    sender_id: i32,
    connection_id: Uuid,
    db_thread_pool: &web::Data<DbThreadPool>,
    registry: &ConnectionRegistry,
) -> Value {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(f) => f,
        Err(_) => return json!({ "error": "Invalid message type" }),
    };

    let result = match frame {
        InboundFrame::DirectMessage {
            receiver_id,
            content,
        } => direct_message(sender_id, receiver_id, content, db_thread_pool, registry).await,
        InboundFrame::GroupMessage {
            department_id,
            content,
        } => group_message(sender_id, department_id, content, db_thread_pool, registry).await,
        InboundFrame::Broadcast { content } => {
            let payload = json!({
                "type": "broadcast",
                "sender_id": sender_id,
                "content": content,
                "timestamp": Utc::now(),
            });

            registry
                .broadcast_except(connection_id, &payload.to_string())
                .await;
            Ok(())
        }
        InboundFrame::TypingIndicator {
            receiver_id,
            is_typing,
        } => {
            let payload = json!({
                "type": "typing_indicator",
                "sender_id": sender_id,
                "is_typing": is_typing,
            });

            registry
                .push_to_user(receiver_id, &payload.to_string())
                .await;
            Ok(())
        }
        InboundFrame::ReadReceipt { message_id } => {
            read_receipt(sender_id, message_id, db_thread_pool, registry).await
        }
    };

    match result {
        Ok(()) => json!({ "message": "Message processed successfully" }),
        Err(e) => e.reply(),
    }
}

async fn direct_message(
    sender_id: i32,
    receiver_id: i32,
    content: String,
    db_thread_pool: &web::Data<DbThreadPool>,
    registry: &ConnectionRegistry,
) -> Result<(), DispatchError> {
    let db_thread_pool = db_thread_pool.clone();
    let (message_id, content, timestamp) = web::block(move || {
        let new_message = NewMessage::new(&content, sender_id, MessageRecipient::User(receiver_id));
        let timestamp = new_message.sent_timestamp;
        let message_id = db::message::Dao::new(&db_thread_pool).create_message(&new_message)?;

        Ok::<_, DaoError>((message_id, content, timestamp))
    })
    .await??;

    let payload = json!({
        "type": "direct_message",
        "message_id": message_id,
        "sender_id": sender_id,
        "content": content,
        "timestamp": timestamp,
    });

    registry
        .push_to_user(receiver_id, &payload.to_string())
        .await;
    Ok(())
}

async fn group_message(
    sender_id: i32,
    department_id: i32,
    content: String,
    db_thread_pool: &web::Data<DbThreadPool>,
    registry: &ConnectionRegistry,
) -> Result<(), DispatchError> {
    let db_thread_pool = db_thread_pool.clone();
    let (message_id, content, timestamp, recipients) = web::block(move || {
        let department_dao = db::department::Dao::new(&db_thread_pool);
        if !department_dao.is_member(sender_id, department_id)? {
            return Err(DispatchError::NotMember);
        }

        let new_message = NewMessage::new(
            &content,
            sender_id,
            MessageRecipient::Department(department_id),
        );
        let timestamp = new_message.sent_timestamp;
        let message_id = db::message::Dao::new(&db_thread_pool).create_message(&new_message)?;

        let recipients = department_dao
            .get_member_ids(department_id)?
            .into_iter()
            .filter(|&id| id != sender_id)
            .collect::<Vec<_>>();

        Ok((message_id, content, timestamp, recipients))
    })
    .await??;

    let payload = json!({
        "type": "group_message",
        "message_id": message_id,
        "group_id": department_id,
        "sender_id": sender_id,
        "content": content,
        "timestamp": timestamp,
    });

    registry
        .push_to_users(&recipients, &payload.to_string())
        .await;
    Ok(())
}

async fn read_receipt(
    reader_id: i32,
    message_id: i32,
    db_thread_pool: &web::Data<DbThreadPool>,
    registry: &ConnectionRegistry,
) -> Result<(), DispatchError> {
    let db_thread_pool = db_thread_pool.clone();
    let original_sender = web::block(move || {
        let message_dao = db::message::Dao::new(&db_thread_pool);

        let message = match message_dao.get_message(message_id) {
            Ok(m) => m,
            Err(e) if e.is_not_found() => return Err(DispatchError::MessageNotFound),
            Err(e) => return Err(e.into()),
        };

        message_dao.mark_read(message_id, reader_id, Utc::now())?;
        Ok(message.sent_by_user_id)
    })
    .await??;

    let payload = json!({
        "type": "read_receipt",
        "message_id": message_id,
        "reader_id": reader_id,
    });

    registry
        .push_to_user(original_sender, &payload.to_string())
        .await;
    Ok(())
}
