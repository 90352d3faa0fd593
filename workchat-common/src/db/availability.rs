use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::db::{DaoError, DbThreadPool};
use crate::models::availability::{Availability, NewAvailability};
use crate::schema::availabilities as availability_fields;
use crate::schema::availabilities::dsl::availabilities;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Swaps the user's whole week for `week` in one transaction. Fails with a foreign
    /// key violation if the user does not exist.
    pub fn replace_week(&self, user_id: i32, week: &[NewAvailability]) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                dsl::delete(availabilities.filter(availability_fields::user_id.eq(user_id)))
                    .execute(conn)?;

                dsl::insert_into(availabilities)
                    .values(week)
                    .execute(conn)?;

                Ok(())
            })?;

        Ok(())
    }

    pub fn get_week(&self, user_id: i32) -> Result<Vec<Availability>, DaoError> {
        Ok(availabilities
            .filter(availability_fields::user_id.eq(user_id))
            .select(Availability::as_select())
            .order(availability_fields::day.asc())
            .load(&mut self.db_thread_pool.get()?)?)
    }

    pub fn clear_week(&self, user_id: i32) -> Result<usize, DaoError> {
        Ok(
            dsl::delete(availabilities.filter(availability_fields::user_id.eq(user_id)))
                .execute(&mut self.db_thread_pool.get()?)?,
        )
    }
}
