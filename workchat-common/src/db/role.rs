use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};
use std::collections::HashMap;

use crate::db::{DaoError, DbThreadPool};
use crate::models::role::{NewRole, Role, RoleChanges, RoleWithUserCount};
use crate::schema::roles as role_fields;
use crate::schema::roles::dsl::roles;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Fails with a unique violation if another role already has the name.
    pub fn create_role(&self, name: &str, description: &str) -> Result<i32, DaoError> {
        Ok(dsl::insert_into(roles)
            .values(&NewRole { name, description })
            .returning(role_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_role(&self, role_id: i32) -> Result<Role, DaoError> {
        Ok(roles
            .find(role_id)
            .select(Role::as_select())
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_role_by_name(&self, name: &str) -> Result<Role, DaoError> {
        Ok(roles
            .filter(role_fields::name.eq(name))
            .select(Role::as_select())
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// Every role ordered by name, with how many users hold it.
    pub fn list_roles(&self) -> Result<Vec<RoleWithUserCount>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (all_roles, counts) = db_connection
            .build_transaction()
            .read_only()
            .run::<_, diesel::result::Error, _>(|conn| {
                let all_roles = roles
                    .select(Role::as_select())
                    .order((role_fields::name.asc(), role_fields::id.asc()))
                    .load(conn)?;

                let counts = users
                    .filter(user_fields::role_id.is_not_null())
                    .group_by(user_fields::role_id)
                    .select((user_fields::role_id, dsl::count_star()))
                    .load::<(Option<i32>, i64)>(conn)?;

                Ok((all_roles, counts))
            })?;

        let counts: HashMap<i32, i64> = counts
            .into_iter()
            .filter_map(|(role_id, count)| role_id.map(|id| (id, count)))
            .collect();

        Ok(all_roles
            .into_iter()
            .map(|role| RoleWithUserCount {
                user_count: counts.get(&role.id).copied().unwrap_or(0),
                role,
            })
            .collect())
    }

    /// Returns the number of rows changed (0 or 1). `changes` must not be empty.
    pub fn update_role(&self, role_id: i32, changes: &RoleChanges) -> Result<usize, DaoError> {
        Ok(dsl::update(roles.find(role_id))
            .set(changes)
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Users holding the role are left without one.
    pub fn delete_role(&self, role_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::delete(roles.find(role_id)).execute(&mut self.db_thread_pool.get()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::{test_utils, user};
    use crate::models::user::UserChanges;

    #[test]
    fn test_role_lifecycle() {
        let dao = Dao::new(test_utils::db_pool());
        let name = test_utils::unique_name("Barista");

        let role_id = dao.create_role(&name, "Makes the coffee").unwrap();
        assert!(dao
            .create_role(&name, "Same name again")
            .unwrap_err()
            .is_unique_violation());

        let role = dao.get_role(role_id).unwrap();
        assert_eq!(role.name, name);
        assert_eq!(role.description, "Makes the coffee");
        assert_eq!(dao.get_role_by_name(&name).unwrap().id, role_id);

        let changes = RoleChanges {
            description: Some("Runs the espresso bar"),
            ..Default::default()
        };
        assert_eq!(dao.update_role(role_id, &changes).unwrap(), 1);
        assert_eq!(dao.update_role(-1, &changes).unwrap(), 0);

        let role = dao.get_role(role_id).unwrap();
        assert_eq!(role.name, name);
        assert_eq!(role.description, "Runs the espresso bar");

        assert_eq!(dao.delete_role(role_id).unwrap(), 1);
        assert_eq!(dao.delete_role(role_id).unwrap(), 0);
        assert!(dao.get_role(role_id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_counts_holders_and_deleting_clears_them() {
        let dao = Dao::new(test_utils::db_pool());
        let user_dao = user::Dao::new(test_utils::db_pool());

        let held_id = dao
            .create_role(&test_utils::unique_name("Cook"), "Line cook")
            .unwrap();
        let empty_id = dao
            .create_role(&test_utils::unique_name("Host"), "Seats guests")
            .unwrap();

        let holders = [test_utils::create_user(false), test_utils::create_user(false)];
        for holder in &holders {
            user_dao.set_role(holder.id, held_id).unwrap();
        }

        let listed = dao.list_roles().unwrap();
        let count_of = |id: i32| {
            listed
                .iter()
                .find(|r| r.role.id == id)
                .map(|r| r.user_count)
        };
        assert_eq!(count_of(held_id), Some(2));
        assert_eq!(count_of(empty_id), Some(0));

        let position_of = |id: i32| listed.iter().position(|r| r.role.id == id);
        assert!(position_of(held_id) < position_of(empty_id));

        dao.delete_role(held_id).unwrap();
        assert_eq!(user_dao.get_user(holders[0].id).unwrap().role_id, None);

        let changes = UserChanges {
            role_id: Some(Some(empty_id)),
            ..Default::default()
        };
        assert_eq!(user_dao.update_user(holders[1].id, &changes).unwrap(), 1);
        assert_eq!(
            user_dao.get_user(holders[1].id).unwrap().role_id,
            Some(empty_id)
        );
    }
}
