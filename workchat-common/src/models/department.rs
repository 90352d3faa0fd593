use diesel::{AsChangeset, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::user::UserSummary;
use crate::schema::departments;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = departments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = departments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDepartment<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = departments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DepartmentChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
}

impl DepartmentChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// A department as listed in the directory, with its head counts and managers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepartmentOverview {
    #[serde(flatten)]
    pub department: Department,
    pub member_count: i64,
    pub shift_count: i64,
    pub managers: Vec<UserSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable)]
pub struct DepartmentMember {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_manager: bool,
}
