use chrono::{DateTime, Utc};
use diesel::{
    dsl, BoolExpressionMethods, ExpressionMethods, JoinOnDsl, NullableExpressionMethods,
    OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper,
};

use crate::db::{DaoError, DbThreadPool};
use crate::models::shift::{
    AvailableShift, NewShift, Shift, ShiftDetails, ShiftStatus, ShiftWithDepartment,
};
use crate::models::user::UserSummary;
use crate::schema::departments as department_fields;
use crate::schema::departments::dsl::departments;
use crate::schema::shifts as shift_fields;
use crate::schema::shifts::dsl::shifts;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

#[derive(Clone, Debug, Default)]
pub struct ShiftFilter {
    pub department_id: Option<i32>,
    pub user_id: Option<i32>,
    pub status: Option<ShiftStatus>,
    pub starts_at_or_after: Option<DateTime<Utc>>,
    pub ends_at_or_before: Option<DateTime<Utc>>,
}

macro_rules! apply_shift_filter {
    ($query:expr, $filter:expr) => {{
        let mut query = $query;

        if let Some(department_id) = $filter.department_id {
            query = query.filter(shift_fields::department_id.eq(department_id));
        }

        if let Some(user_id) = $filter.user_id {
            query = query.filter(shift_fields::user_id.eq(user_id));
        }

        if let Some(status) = $filter.status {
            query = query.filter(shift_fields::status.eq(status));
        }

        if let Some(start) = $filter.starts_at_or_after {
            query = query.filter(shift_fields::start_time.ge(start));
        }

        if let Some(end) = $filter.ends_at_or_before {
            query = query.filter(shift_fields::end_time.le(end));
        }

        query
    }};
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_shift(&self, new_shift: &NewShift) -> Result<i32, DaoError> {
        Ok(dsl::insert_into(shifts)
            .values(new_shift)
            .returning(shift_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_shift(&self, shift_id: i32) -> Result<Shift, DaoError> {
        Ok(shifts
            .find(shift_id)
            .select(Shift::as_select())
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_shift_details(&self, shift_id: i32) -> Result<ShiftDetails, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (shift, department_name) = shifts
            .inner_join(departments)
            .filter(shift_fields::id.eq(shift_id))
            .select((Shift::as_select(), department_fields::name))
            .get_result::<(Shift, String)>(&mut db_connection)?;

        let mut people_ids = vec![shift.scheduled_by_id];
        people_ids.extend(shift.user_id);

        let people = users
            .filter(user_fields::id.eq_any(people_ids))
            .select((
                user_fields::id,
                user_fields::first_name,
                user_fields::last_name,
            ))
            .load::<UserSummary>(&mut db_connection)?;

        let find = |id: i32| people.iter().find(|p| p.id == id).cloned();

        Ok(ShiftDetails {
            scheduled_by: find(shift.scheduled_by_id),
            assigned_user: shift.user_id.and_then(find),
            shift,
            department_name,
        })
    }

    /// Returns one page of matching shifts ordered by start time, plus the total count.
    pub fn list_shifts(
        &self,
        filter: &ShiftFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ShiftWithDepartment>, i64), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let total = apply_shift_filter!(shifts.select(dsl::count_star()).into_boxed(), filter)
            .get_result::<i64>(&mut db_connection)?;

        let page_query = shifts
            .inner_join(departments)
            .select((Shift::as_select(), department_fields::name))
            .order((shift_fields::start_time.asc(), shift_fields::id.asc()))
            .into_boxed();

        let page = apply_shift_filter!(page_query, filter)
            .limit(limit)
            .offset(offset)
            .load::<(Shift, String)>(&mut db_connection)?
            .into_iter()
            .map(|(shift, department_name)| ShiftWithDepartment {
                shift,
                department_name,
            })
            .collect();

        Ok((page, total))
    }

    /// The earliest shift after `now` that the user still holds.
    pub fn get_next_shift(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ShiftWithDepartment>, DaoError> {
        let next = shifts
            .inner_join(departments)
            .filter(shift_fields::user_id.eq(user_id))
            .filter(shift_fields::status.eq_any(ShiftStatus::holding()))
            .filter(shift_fields::start_time.gt(now))
            .select((Shift::as_select(), department_fields::name))
            .order(shift_fields::start_time.asc())
            .first::<(Shift, String)>(&mut self.db_thread_pool.get()?)
            .optional()?;

        Ok(next.map(|(shift, department_name)| ShiftWithDepartment {
            shift,
            department_name,
        }))
    }

    /// Future shifts in the given departments that are open for exchange or unassigned.
    pub fn get_available_shifts(
        &self,
        department_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailableShift>, DaoError> {
        let rows = shifts
            .inner_join(departments)
            .left_join(users.on(shift_fields::user_id.eq(user_fields::id.nullable())))
            .filter(
                shift_fields::status
                    .eq(ShiftStatus::AvailableForExchange)
                    .or(shift_fields::user_id.is_null()),
            )
            .filter(shift_fields::department_id.eq_any(department_ids))
            .filter(shift_fields::start_time.gt(now))
            .filter(shift_fields::status.ne_all(ShiftStatus::terminal()))
            .select((
                Shift::as_select(),
                department_fields::name,
                (
                    user_fields::id,
                    user_fields::first_name,
                    user_fields::last_name,
                )
                    .nullable(),
            ))
            .order((shift_fields::start_time.asc(), shift_fields::id.asc()))
            .load::<(Shift, String, Option<UserSummary>)>(&mut self.db_thread_pool.get()?)?;

        Ok(rows
            .into_iter()
            .map(|(shift, department_name, current_user)| {
                AvailableShift::new(shift, department_name, current_user)
            })
            .collect())
    }

    /// Whether the user holds a shift, other than `excluding_shift_id`, that overlaps
    /// `[start, end]`. Intervals sharing a boundary instant overlap.
    pub fn has_conflict(
        &self,
        user_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        excluding_shift_id: i32,
    ) -> Result<bool, DaoError> {
        Ok(dsl::select(dsl::exists(
            shifts
                .filter(shift_fields::user_id.eq(user_id))
                .filter(shift_fields::status.eq_any(ShiftStatus::holding()))
                .filter(shift_fields::start_time.le(end))
                .filter(shift_fields::end_time.ge(start))
                .filter(shift_fields::id.ne(excluding_shift_id)),
        ))
        .get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// Moves a scheduled shift held by `user_id` into the exchange pool. The holder is
    /// kept. Returns the number of rows changed (0 or 1).
    pub fn mark_available_if_scheduled(
        &self,
        shift_id: i32,
        user_id: i32,
    ) -> Result<usize, DaoError> {
        Ok(dsl::update(
            shifts
                .filter(shift_fields::id.eq(shift_id))
                .filter(shift_fields::user_id.eq(user_id))
                .filter(shift_fields::status.eq(ShiftStatus::Scheduled)),
        )
        .set(shift_fields::status.eq(ShiftStatus::AvailableForExchange))
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Gives an exchange-pool shift to `user_id`. The status condition is re-checked by
    /// the update itself, so of two concurrent claims only one changes a row.
    pub fn claim_if_available(&self, shift_id: i32, user_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::update(
            shifts
                .filter(shift_fields::id.eq(shift_id))
                .filter(shift_fields::status.eq(ShiftStatus::AvailableForExchange)),
        )
        .set((
            shift_fields::user_id.eq(Some(user_id)),
            shift_fields::status.eq(ShiftStatus::Scheduled),
        ))
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Gives the shift to `user_id` unless it is completed or cancelled. Returns the
    /// number of rows changed (0 or 1).
    pub fn assign(&self, shift_id: i32, user_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::update(
            shifts
                .filter(shift_fields::id.eq(shift_id))
                .filter(shift_fields::status.ne_all(ShiftStatus::terminal())),
        )
        .set((
            shift_fields::user_id.eq(Some(user_id)),
            shift_fields::status.eq(ShiftStatus::Scheduled),
        ))
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Returns a held shift to the exchange pool unless it is completed or cancelled.
    pub fn unassign(&self, shift_id: i32) -> Result<usize, DaoError> {
        Ok(dsl::update(
            shifts
                .filter(shift_fields::id.eq(shift_id))
                .filter(shift_fields::status.ne_all(ShiftStatus::terminal())),
        )
        .set((
            shift_fields::user_id.eq(None::<i32>),
            shift_fields::status.eq(ShiftStatus::AvailableForExchange),
        ))
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    /// Returns the cancelled shift, or `None` if no shift has the ID.
    pub fn cancel(&self, shift_id: i32) -> Result<Option<Shift>, DaoError> {
        Ok(dsl::update(shifts.find(shift_id))
            .set(shift_fields::status.eq(ShiftStatus::Cancelled))
            .returning(Shift::as_returning())
            .get_result(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    /// Marks every still-held shift that ended before `now` as completed.
    pub fn complete_past_shifts(&self, now: DateTime<Utc>) -> Result<usize, DaoError> {
        Ok(dsl::update(
            shifts
                .filter(shift_fields::status.eq_any(ShiftStatus::holding()))
                .filter(shift_fields::end_time.lt(now)),
        )
        .set(shift_fields::status.eq(ShiftStatus::Completed))
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}
