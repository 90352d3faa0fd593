use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::db::{DaoError, DbThreadPool};
use crate::models::time_off_request::{NewTimeOffRequest, TimeOffRequest, TimeOffStatus};
use crate::schema::time_off_requests as request_fields;
use crate::schema::time_off_requests::dsl::time_off_requests;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_request(&self, new_request: &NewTimeOffRequest) -> Result<i32, DaoError> {
        Ok(dsl::insert_into(time_off_requests)
            .values(new_request)
            .returning(request_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_requests_for_user(&self, user_id: i32) -> Result<Vec<TimeOffRequest>, DaoError> {
        Ok(time_off_requests
            .select(TimeOffRequest::as_select())
            .filter(request_fields::user_id.eq(user_id))
            .order((
                request_fields::start_date.desc(),
                request_fields::id.desc(),
            ))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    /// Returns the updated request, or `None` if no request has the ID.
    pub fn set_status(
        &self,
        request_id: i32,
        status: TimeOffStatus,
    ) -> Result<Option<TimeOffRequest>, DaoError> {
        Ok(dsl::update(time_off_requests.find(request_id))
            .set(request_fields::status.eq(status.as_str()))
            .returning(TimeOffRequest::as_returning())
            .get_result(&mut self.db_thread_pool.get()?)
            .optional()?)
    }
}
