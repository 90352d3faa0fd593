use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::schema::message_reads;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Insertable, Queryable)]
#[diesel(table_name = message_reads, primary_key(message_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRead {
    pub message_id: i32,
    pub user_id: i32,
    pub read_timestamp: DateTime<Utc>,
}
