use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::schema::department_memberships;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Insertable, Queryable)]
#[diesel(table_name = department_memberships, primary_key(user_id, department_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DepartmentMembership {
    pub user_id: i32,
    pub department_id: i32,
}
