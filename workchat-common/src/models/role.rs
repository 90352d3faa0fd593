use diesel::{AsChangeset, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::schema::roles;

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Identifiable, Queryable, Selectable,
)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRole<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoleChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl RoleChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleWithUserCount {
    #[serde(flatten)]
    pub role: Role,
    pub user_count: i64,
}
