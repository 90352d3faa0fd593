use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::user::UserSummary;
use crate::schema::messages;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Message {
    pub id: i32,
    pub content: String,
    pub sent_by_user_id: i32,
    pub received_by_user_id: Option<i32>,
    pub department_id: Option<i32>,
    pub sent_timestamp: DateTime<Utc>,
    pub edited_timestamp: Option<DateTime<Utc>>,
}

/// A message is addressed to exactly one user or to every member of one department.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRecipient {
    User(i32),
    Department(i32),
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewMessage<'a> {
    pub content: &'a str,
    pub sent_by_user_id: i32,
    pub received_by_user_id: Option<i32>,
    pub department_id: Option<i32>,
    pub sent_timestamp: DateTime<Utc>,
}

impl<'a> NewMessage<'a> {
    pub fn new(content: &'a str, sender_id: i32, recipient: MessageRecipient) -> Self {
        let (received_by_user_id, department_id) = match recipient {
            MessageRecipient::User(id) => (Some(id), None),
            MessageRecipient::Department(id) => (None, Some(id)),
        };

        Self {
            content,
            sent_by_user_id: sender_id,
            received_by_user_id,
            department_id,
            sent_timestamp: Utc::now(),
        }
    }
}

/// A message joined with its sender's display name, as pushed to live connections.
#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct MessageWithSender {
    pub id: i32,
    pub content: String,
    #[serde(rename = "time_stamp")]
    pub sent_timestamp: DateTime<Utc>,
    pub sent_by_user_id: i32,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub received_by_user_id: Option<i32>,
    pub department_id: Option<i32>,
}

/// The latest direct message exchanged with one counterpart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub user: UserSummary,
    pub last_message: Message,
}
