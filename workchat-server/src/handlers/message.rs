use workchat_common::db::{self, DaoError, DbThreadPool};
use workchat_common::models::message::{Message, MessageRecipient, NewMessage};
use workchat_common::notifications::{best_effort, NotificationSink, NotificationTemplate};
use workchat_common::request_io::{InputMessage, InputMessageEdit, OutputId, OutputMessage};

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::Authenticated;
use crate::relay::ConnectionRegistry;

enum SendError {
    NotMember,
    Dao(DaoError),
}

impl From<DaoError> for SendError {
    fn from(e: DaoError) -> Self {
        SendError::Dao(e)
    }
}

/// Users who should see live updates to a message: the direct receiver, or every other
/// member of the addressed department.
fn audience(db_thread_pool: &DbThreadPool, message: &Message) -> Result<Vec<i32>, DaoError> {
    match (message.received_by_user_id, message.department_id) {
        (Some(receiver_id), _) => Ok(vec![receiver_id]),
        (None, Some(department_id)) => Ok(db::department::Dao::new(db_thread_pool)
            .get_member_ids(department_id)?
            .into_iter()
            .filter(|&id| id != message.sent_by_user_id)
            .collect()),
        (None, None) => Ok(Vec::new()),
    }
}

pub async fn send(
    db_thread_pool: web::Data<DbThreadPool>,
    registry: web::Data<ConnectionRegistry>,
    token: Authenticated,
    message: web::Json<InputMessage>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let message = message.into_inner();

    if message.content.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Missing content field".into(),
        ));
    }

    let recipient = match (message.received_by_user_id, message.department_id) {
        (Some(user_id), None) => MessageRecipient::User(user_id),
        (None, Some(department_id)) => MessageRecipient::Department(department_id),
        _ => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                "Exactly one of received_by_user_id or department_id is required".into(),
            ));
        }
    };

    let sender_id = token.claims.user_id;

    let result = web::block(move || {
        if let MessageRecipient::Department(department_id) = recipient {
            if !db::department::Dao::new(&db_thread_pool).is_member(sender_id, department_id)? {
                return Err(SendError::NotMember);
            }
        }

        let message_dao = db::message::Dao::new(&db_thread_pool);
        let message_id =
            message_dao.create_message(&NewMessage::new(&message.content, sender_id, recipient))?;
        let sent = message_dao.get_message_with_sender(message_id)?;

        let recipients = match recipient {
            MessageRecipient::User(receiver_id) => {
                let sender_name = format!("{} {}", sent.sender_first_name, sent.sender_last_name);
                best_effort(
                    "notify receiver of new message",
                    db::notification::Dao::new(&db_thread_pool).notify_user(
                        receiver_id,
                        &NotificationTemplate::NewMessage {
                            sender_name: &sender_name,
                            content: &sent.content,
                        }
                        .render(),
                    ),
                );

                vec![receiver_id]
            }
            MessageRecipient::Department(department_id) => {
                db::department::Dao::new(&db_thread_pool)
                    .get_member_ids(department_id)?
                    .into_iter()
                    .filter(|&id| id != sender_id)
                    .collect()
            }
        };

        Ok((sent, recipients))
    })
    .await?;

    let (sent, recipients) = match result {
        Ok(r) => r,
        Err(SendError::NotMember) => {
            return Err(HttpErrorResponse::UserDisallowed(
                "User not authorized for this department".into(),
            ));
        }
        Err(SendError::Dao(e)) if e.is_foreign_key_violation() => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Recipient not found".into(),
            ));
        }
        Err(SendError::Dao(e)) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "An error occurred while sending the message".into(),
            ));
        }
    };

    let payload = json!({ "type": "new_message", "message": &sent });
    registry
        .push_to_users(&recipients, &payload.to_string())
        .await;

    Ok(HttpResponse::Created().json(OutputId { id: sent.id }))
}

pub async fn get_conversation(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    other_user_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = token.claims.user_id;
    let other_user_id = other_user_id.into_inner();

    let conversation = match web::block(move || {
        db::message::Dao::new(&db_thread_pool).get_conversation(user_id, other_user_id)
    })
    .await?
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get conversation".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(conversation))
}

pub async fn get_conversations(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = token.claims.user_id;

    let conversations = match web::block(move || {
        db::message::Dao::new(&db_thread_pool).get_conversations(user_id)
    })
    .await?
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get conversations".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(conversations))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    registry: web::Data<ConnectionRegistry>,
    token: Authenticated,
    message_id: web::Path<i32>,
    edit: web::Json<InputMessageEdit>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let edit = edit.into_inner();

    if edit.content.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Missing content field".into(),
        ));
    }

    let sender_id = token.claims.user_id;
    let message_id = message_id.into_inner();

    let edited = match web::block(move || {
        let message_dao = db::message::Dao::new(&db_thread_pool);

        let Some(message) = message_dao.edit_message(message_id, sender_id, &edit.content)?
        else {
            return Ok(None);
        };

        let updated = message_dao.get_message_with_sender(message.id)?;
        let recipients = audience(&db_thread_pool, &message)?;

        Ok::<_, DaoError>(Some((updated, recipients)))
    })
    .await?
    {
        Ok(Some(e)) => e,
        Ok(None) => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Message not found".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "An error occurred while updating the message".into(),
            ));
        }
    };

    let (updated, recipients) = edited;
    let payload = json!({ "type": "update_message", "message": &updated });
    registry
        .push_to_users(&recipients, &payload.to_string())
        .await;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Message updated successfully",
    }))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    registry: web::Data<ConnectionRegistry>,
    token: Authenticated,
    message_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let sender_id = token.claims.user_id;
    let message_id = message_id.into_inner();

    let recipients = match web::block(move || -> Result<Option<Vec<i32>>, DaoError> {
        match db::message::Dao::new(&db_thread_pool).delete_message(message_id, sender_id)? {
            Some(message) => audience(&db_thread_pool, &message).map(Some),
            None => Ok(None),
        }
    })
    .await?
    {
        Ok(Some(r)) => r,
        Ok(None) => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Message not found".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "An error occurred while deleting the message".into(),
            ));
        }
    };

    let payload = json!({ "type": "delete_message", "message": { "id": message_id } });
    registry
        .push_to_users(&recipients, &payload.to_string())
        .await;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Message deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use serde_json::Value;
    use std::sync::Arc;

    use crate::env;
    use crate::handlers::test_utils::{self, bearer};
    use crate::relay::testing::RecordingConnection;

    fn listen(user_id: i32) -> (uuid::Uuid, Arc<RecordingConnection>) {
        let connection = Arc::new(RecordingConnection::default());
        let connection_id = env::testing::CONNECTIONS.register(user_id, connection.clone());
        (connection_id, connection)
    }

    #[actix_web::test]
    async fn test_send_direct_message() {
        let app = test_utils::init_app().await;
        let (alice, alice_token) = test_utils::create_user(false);
        let (bob, bob_token) = test_utils::create_user(false);
        let (bob_connection_id, bob_connection) = listen(bob.id);

        let req = TestRequest::post()
            .uri("/api/messages")
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "content": "Hi Bob", "received_by_user_id": bob.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        let message_id = body["id"].as_i64().unwrap();

        let pushed = bob_connection.payloads();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0]["type"], "new_message");
        assert_eq!(pushed[0]["message"]["id"], message_id);
        assert_eq!(pushed[0]["message"]["content"], "Hi Bob");
        assert_eq!(pushed[0]["message"]["sender_first_name"], "Test");
        assert!(pushed[0]["message"]["time_stamp"].is_string());

        let (notifications, _) = db::notification::Dao::new(&env::testing::DB_THREAD_POOL)
            .get_notifications(bob.id, 10, 0, false)
            .unwrap();
        assert_eq!(notifications[0].content, "New message from Test User: Hi Bob");

        let req = TestRequest::get()
            .uri(&format!("/api/messages/conversation/{}", alice.id))
            .insert_header(bearer(&bob_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], message_id);

        let req = TestRequest::get()
            .uri("/api/messages/conversations")
            .insert_header(bearer(&bob_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body[0]["user"]["id"], alice.id);
        assert_eq!(body[0]["last_message"]["id"], message_id);

        env::testing::CONNECTIONS.unregister(bob_connection_id);
    }

    #[actix_web::test]
    async fn test_send_rejections() {
        let app = test_utils::init_app().await;
        let (_, token) = test_utils::create_user(false);
        let department_id = test_utils::create_department();

        for (body, status) in [
            (json!({ "content": "Nobody" }), StatusCode::BAD_REQUEST),
            (
                json!({ "content": "Both", "received_by_user_id": 1, "department_id": 1 }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "content": "  ", "received_by_user_id": 1 }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "content": "Ghost", "received_by_user_id": -1 }),
                StatusCode::NOT_FOUND,
            ),
            (
                json!({ "content": "Not my team", "department_id": department_id }),
                StatusCode::FORBIDDEN,
            ),
        ] {
            let req = TestRequest::post()
                .uri("/api/messages")
                .insert_header(bearer(&token))
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), status);
        }
    }

    #[actix_web::test]
    async fn test_group_message_reaches_other_members() {
        let app = test_utils::init_app().await;
        let (sender, sender_token) = test_utils::create_user(false);
        let (member, _) = test_utils::create_user(false);
        let department_id = test_utils::create_department();
        test_utils::add_member(sender.id, department_id);
        test_utils::add_member(member.id, department_id);

        let (sender_connection_id, sender_connection) = listen(sender.id);
        let (member_connection_id, member_connection) = listen(member.id);

        let req = TestRequest::post()
            .uri("/api/messages")
            .insert_header(bearer(&sender_token))
            .set_json(json!({ "content": "Huddle at noon", "department_id": department_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        assert!(sender_connection.payloads().is_empty());
        let pushed = member_connection.payloads();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0]["message"]["department_id"], department_id);

        env::testing::CONNECTIONS.unregister(sender_connection_id);
        env::testing::CONNECTIONS.unregister(member_connection_id);
    }

    #[actix_web::test]
    async fn test_edit_and_delete() {
        let app = test_utils::init_app().await;
        let (alice, alice_token) = test_utils::create_user(false);
        let (bob, bob_token) = test_utils::create_user(false);
        let (bob_connection_id, bob_connection) = listen(bob.id);

        let message_id = db::message::Dao::new(&env::testing::DB_THREAD_POOL)
            .create_message(&NewMessage::new(
                "Typo",
                alice.id,
                MessageRecipient::User(bob.id),
            ))
            .unwrap();
        let uri = format!("/api/messages/{message_id}");

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "content": "Not mine" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "content": "Fixed" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&bob_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&alice_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let pushed = bob_connection.payloads();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[0]["type"], "update_message");
        assert_eq!(pushed[0]["message"]["content"], "Fixed");
        assert_eq!(pushed[1], json!({ "type": "delete_message", "message": { "id": message_id } }));

        assert!(db::message::Dao::new(&env::testing::DB_THREAD_POOL)
            .get_message(message_id)
            .unwrap_err()
            .is_not_found());

        env::testing::CONNECTIONS.unregister(bob_connection_id);
    }
}
