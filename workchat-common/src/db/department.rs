use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};
use std::collections::HashMap;

use crate::db::{DaoError, DbThreadPool};
use crate::models::department::{
    Department, DepartmentChanges, DepartmentMember, DepartmentOverview, NewDepartment,
};
use crate::models::department_membership::DepartmentMembership;
use crate::models::user::UserSummary;
use crate::schema::department_memberships as membership_fields;
use crate::schema::department_memberships::dsl::department_memberships;
use crate::schema::departments as department_fields;
use crate::schema::departments::dsl::departments;
use crate::schema::shifts as shift_fields;
use crate::schema::shifts::dsl::shifts;
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

    pub fn create_department(&self, name: &str, description: Option<&str>) -> Result<i32, DaoError> {
        let new_department = NewDepartment { name, description };

        Ok(dsl::insert_into(departments)
            .values(&new_department)
            .returning(department_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_department(&self, department_id: i32) -> Result<Department, DaoError> {
        Ok(departments
            .find(department_id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_members(&self, department_id: i32) -> Result<Vec<DepartmentMember>, DaoError> {
        Ok(department_memberships
            .inner_join(users)
            .filter(membership_fields::department_id.eq(department_id))
            .select((
                user_fields::id,
                user_fields::first_name,
                user_fields::last_name,
                user_fields::email,
                user_fields::is_manager,
            ))
            .order((user_fields::last_name.asc(), user_fields::first_name.asc()))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_manager_ids(&self, department_id: i32) -> Result<Vec<i32>, DaoError> {
        Ok(department_memberships
            .inner_join(users)
            .filter(membership_fields::department_id.eq(department_id))
            .filter(user_fields::is_manager.eq(true))
            .select(user_fields::id)
            .load(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_member_ids(&self, department_id: i32) -> Result<Vec<i32>, DaoError> {
        Ok(department_memberships
            .select(membership_fields::user_id)
            .filter(membership_fields::department_id.eq(department_id))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    pub fn is_member(&self, user_id: i32, department_id: i32) -> Result<bool, DaoError> {
        Ok(dsl::select(dsl::exists(
            department_memberships
                .filter(membership_fields::user_id.eq(user_id))
                .filter(membership_fields::department_id.eq(department_id)),
        ))
        .get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// Fails with a unique violation if the user already belongs to the department.
    pub fn add_member(&self, user_id: i32, department_id: i32) -> Result<(), DaoError> {
        let membership = DepartmentMembership {
            user_id,
            department_id,
        };

        dsl::insert_into(department_memberships)
            .values(&membership)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn remove_member(&self, user_id: i32, department_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::delete(
            department_memberships
                .filter(membership_fields::user_id.eq(user_id))
                .filter(membership_fields::department_id.eq(department_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Returns the number of rows changed (0 or 1). `changes` must not be empty.
    pub fn update_department(
        &self,
        department_id: i32,
        changes: &DepartmentChanges,
    ) -> Result<usize, DaoError> {
        Ok(dsl::update(departments.find(department_id))
            .set(changes)
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Memberships, shifts and department messages go with the department.
    pub fn delete_department(&self, department_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::delete(departments.find(department_id))
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Every department ordered by name, with member and shift counts and its managers.
    pub fn list_departments(&self) -> Result<Vec<DepartmentOverview>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (all_departments, member_counts, shift_counts, managers) = db_connection
            .build_transaction()
            .read_only()
            .run::<_, diesel::result::Error, _>(|conn| {
                let all_departments = departments
                    .select(Department::as_select())
                    .order((department_fields::name.asc(), department_fields::id.asc()))
                    .load(conn)?;

                let member_counts = department_memberships
                    .group_by(membership_fields::department_id)
                    .select((membership_fields::department_id, dsl::count_star()))
                    .load::<(i32, i64)>(conn)?;

                let shift_counts = shifts
                    .group_by(shift_fields::department_id)
                    .select((shift_fields::department_id, dsl::count_star()))
                    .load::<(i32, i64)>(conn)?;

                let managers = department_memberships
                    .inner_join(users)
                    .filter(user_fields::is_manager.eq(true))
                    .select((
                        membership_fields::department_id,
                        (
                            user_fields::id,
                            user_fields::first_name,
                            user_fields::last_name,
                        ),
                    ))
                    .order((user_fields::last_name.asc(), user_fields::first_name.asc()))
                    .load::<(i32, UserSummary)>(conn)?;

                Ok((all_departments, member_counts, shift_counts, managers))
            })?;

        let member_counts: HashMap<i32, i64> = member_counts.into_iter().collect();
        let shift_counts: HashMap<i32, i64> = shift_counts.into_iter().collect();

        let mut managers_by_department: HashMap<i32, Vec<UserSummary>> = HashMap::new();
        for (department_id, manager) in managers {
            managers_by_department
                .entry(department_id)
                .or_default()
                .push(manager);
        }

        Ok(all_departments
            .into_iter()
            .map(|department| DepartmentOverview {
                member_count: member_counts.get(&department.id).copied().unwrap_or(0),
                shift_count: shift_counts.get(&department.id).copied().unwrap_or(0),
                managers: managers_by_department
                    .remove(&department.id)
                    .unwrap_or_default(),
                department,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;
    use crate::models::shift::ShiftStatus;

    #[test]
    fn test_membership_lifecycle() {
        let manager = test_utils::create_user(true);
        let employee = test_utils::create_user(false);
        let department_id = test_utils::create_department();

        let dao = Dao::new(test_utils::db_pool());

        assert!(!dao.is_member(employee.id, department_id).unwrap());

        dao.add_member(employee.id, department_id).unwrap();
        dao.add_member(manager.id, department_id).unwrap();

        assert!(dao.is_member(employee.id, department_id).unwrap());
        assert!(dao
            .add_member(employee.id, department_id)
            .unwrap_err()
            .is_unique_violation());

        let members = dao.get_members(department_id).unwrap();
        assert_eq!(members.len(), 2);

        assert_eq!(dao.get_manager_ids(department_id).unwrap(), vec![manager.id]);

        let mut member_ids = dao.get_member_ids(department_id).unwrap();
        member_ids.sort();
        let mut expected = vec![manager.id, employee.id];
        expected.sort();
        assert_eq!(member_ids, expected);

        assert_eq!(dao.remove_member(employee.id, department_id).unwrap(), 1);
        assert_eq!(dao.remove_member(employee.id, department_id).unwrap(), 0);
        assert!(!dao.is_member(employee.id, department_id).unwrap());
    }

    #[test]
    fn test_get_department() {
        let dao = Dao::new(test_utils::db_pool());
        let id = dao
            .create_department("Front Desk", Some("Reception and check-in"))
            .unwrap();

        let department = dao.get_department(id).unwrap();
        assert_eq!(department.name, "Front Desk");
        assert_eq!(department.description.as_deref(), Some("Reception and check-in"));

        assert!(dao.get_department(-1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_and_delete_department() {
        let dao = Dao::new(test_utils::db_pool());
        let id = dao.create_department("Bakery", Some("Bread")).unwrap();

        let rename = DepartmentChanges {
            name: Some("Pastry"),
            ..Default::default()
        };
        assert_eq!(dao.update_department(id, &rename).unwrap(), 1);

        let department = dao.get_department(id).unwrap();
        assert_eq!(department.name, "Pastry");
        assert_eq!(department.description.as_deref(), Some("Bread"));

        let clear = DepartmentChanges {
            description: Some(None),
            ..Default::default()
        };
        dao.update_department(id, &clear).unwrap();
        assert_eq!(dao.get_department(id).unwrap().description, None);

        assert_eq!(dao.update_department(-1, &rename).unwrap(), 0);
        assert!(DepartmentChanges::default().is_empty());

        let member = test_utils::create_user(false);
        test_utils::add_member(member.id, id);

        assert_eq!(dao.delete_department(id).unwrap(), 1);
        assert_eq!(dao.delete_department(id).unwrap(), 0);
        assert!(dao.get_department(id).unwrap_err().is_not_found());
        assert!(!dao.is_member(member.id, id).unwrap());
    }

    #[test]
    fn test_list_departments_with_counts_and_managers() {
        let manager = test_utils::create_user(true);
        let employee = test_utils::create_user(false);
        let busy = test_utils::create_department();
        let quiet = test_utils::create_department();

        test_utils::add_member(manager.id, busy);
        test_utils::add_member(employee.id, busy);

        for hour in [1, 6] {
            test_utils::create_shift(
                busy,
                manager.id,
                None,
                ShiftStatus::AvailableForExchange,
                test_utils::future_hour(hour),
                test_utils::future_hour(hour + 4),
            );
        }

        let listed = Dao::new(test_utils::db_pool()).list_departments().unwrap();

        let overview = listed.iter().find(|d| d.department.id == busy).unwrap();
        assert_eq!(overview.member_count, 2);
        assert_eq!(overview.shift_count, 2);
        assert_eq!(overview.managers.len(), 1);
        assert_eq!(overview.managers[0].id, manager.id);

        let overview = listed.iter().find(|d| d.department.id == quiet).unwrap();
        assert_eq!(overview.member_count, 0);
        assert_eq!(overview.shift_count, 0);
        assert!(overview.managers.is_empty());
    }
}
