use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::schema::notifications;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_timestamp: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewNotification<'a> {
    pub user_id: i32,
    pub content: &'a str,
    pub created_timestamp: DateTime<Utc>,
    pub is_read: bool,
}
