use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::department::Department;
use crate::schema::users;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_manager: bool,
    pub created_timestamp: DateTime<Utc>,
    pub role_id: Option<i32>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: Option<&'a str>,
    pub password_hash: &'a str,
    pub is_manager: bool,
    pub created_timestamp: DateTime<Utc>,
}

/// A partial profile update. `None` leaves the stored value alone; the nested `Option`
/// on nullable columns distinguishes "clear it" from "keep it".
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserChanges<'a> {
    pub email: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone_number: Option<Option<&'a str>>,
    pub is_manager: Option<bool>,
    pub role_id: Option<Option<i32>>,
}

impl UserChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.is_manager.is_none()
            && self.role_id.is_none()
    }
}

/// The subset of a user that is safe to show to coworkers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Queryable)]
pub struct UserSummary {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

/// A user as listed to coworkers, with the name of their role and their departments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserListing {
    #[serde(flatten)]
    pub user: User,
    pub role_name: Option<String>,
    pub departments: Vec<Department>,
}
