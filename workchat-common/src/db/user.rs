use diesel::{
    dsl, ExpressionMethods, NullableExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper,
};
use std::collections::HashMap;

use crate::db::{DaoError, DbThreadPool};
use crate::models::department::Department;
use crate::models::user::{NewUser, User, UserChanges, UserListing};
use crate::schema::department_memberships as membership_fields;
use crate::schema::department_memberships::dsl::department_memberships;
use crate::schema::departments as department_fields;
use crate::schema::departments::dsl::departments;
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

    pub fn create_user(&self, new_user: &NewUser) -> Result<i32, DaoError> {
        Ok(dsl::insert_into(users)
            .values(new_user)
            .returning(user_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user(&self, user_id: i32) -> Result<User, DaoError> {
        Ok(users
            .find(user_id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_by_email(&self, user_email: &str) -> Result<User, DaoError> {
        Ok(users
            .filter(user_fields::email.eq(user_email))
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_departments(&self, user_id: i32) -> Result<Vec<Department>, DaoError> {
        Ok(department_memberships
            .inner_join(departments)
            .filter(membership_fields::user_id.eq(user_id))
            .select(Department::as_select())
            .order(department_fields::name.asc())
            .load(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_department_ids(&self, user_id: i32) -> Result<Vec<i32>, DaoError> {
        Ok(department_memberships
            .select(membership_fields::department_id)
            .filter(membership_fields::user_id.eq(user_id))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    pub fn update_password_hash(&self, user_id: i32, password_hash: &str) -> Result<(), DaoError> {
        dsl::update(users.find(user_id))
            .set(user_fields::password_hash.eq(password_hash))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    /// Returns the number of rows changed (0 or 1). `changes` must not be empty. A taken
    /// email is a unique violation and an unknown role a foreign key violation.
    pub fn update_user(&self, user_id: i32, changes: &UserChanges) -> Result<usize, DaoError> {
        Ok(dsl::update(users.find(user_id))
            .set(changes)
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Returns the updated user, or a not-found error if there is no such user.
    pub fn set_role(&self, user_id: i32, role_id: i32) -> Result<User, DaoError> {
        Ok(dsl::update(users.find(user_id))
            .set(user_fields::role_id.eq(role_id))
            .returning(User::as_returning())
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_user(&self, user_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::delete(users.find(user_id)).execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Every user ordered by last then first name.
    pub fn list_users(&self) -> Result<Vec<UserListing>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (all_users, memberships) = db_connection
            .build_transaction()
            .read_only()
            .run::<_, diesel::result::Error, _>(|conn| {
                let all_users = users
                    .left_join(roles)
                    .select((User::as_select(), role_fields::name.nullable()))
                    .order((
                        user_fields::last_name.asc(),
                        user_fields::first_name.asc(),
                        user_fields::id.asc(),
                    ))
                    .load::<(User, Option<String>)>(conn)?;

                let memberships = department_memberships
                    .inner_join(departments)
                    .select((membership_fields::user_id, Department::as_select()))
                    .order(department_fields::name.asc())
                    .load::<(i32, Department)>(conn)?;

                Ok((all_users, memberships))
            })?;

        let mut departments_by_user: HashMap<i32, Vec<Department>> = HashMap::new();
        for (user_id, department) in memberships {
            departments_by_user
                .entry(user_id)
                .or_default()
                .push(department);
        }

        Ok(all_users
            .into_iter()
            .map(|(user, role_name)| UserListing {
                departments: departments_by_user.remove(&user.id).unwrap_or_default(),
                user,
                role_name,
            })
            .collect())
    }
}
