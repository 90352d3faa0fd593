use chrono::{DateTime, Utc};
use diesel::sql_types::{Bool, Text, Timestamptz};
use diesel::{dsl, ExpressionMethods, IntoSql, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::db::{DaoError, DbThreadPool};
use crate::models::notification::{NewNotification, Notification};
use crate::notifications::NotificationSink;
use crate::schema::department_memberships as membership_fields;
use crate::schema::department_memberships::dsl::department_memberships;
use crate::schema::notifications as notification_fields;
use crate::schema::notifications::dsl::notifications;
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

    /// Returns one page of the user's notifications, newest first, along with the total
    /// number of notifications matching the filter.
    pub fn get_notifications(
        &self,
        user_id: i32,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> Result<(Vec<Notification>, i64), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let mut page_query = notifications
            .select(Notification::as_select())
            .filter(notification_fields::user_id.eq(user_id))
            .order((
                notification_fields::created_timestamp.desc(),
                notification_fields::id.desc(),
            ))
            .into_boxed();
        let mut count_query = notifications
            .select(dsl::count_star())
            .filter(notification_fields::user_id.eq(user_id))
            .into_boxed();

        if unread_only {
            page_query = page_query.filter(notification_fields::is_read.eq(false));
            count_query = count_query.filter(notification_fields::is_read.eq(false));
        }

        let total = count_query.get_result::<i64>(&mut db_connection)?;
        let page = page_query
            .limit(limit)
            .offset(offset)
            .load(&mut db_connection)?;

        Ok((page, total))
    }

    /// Marks the user's unread notifications as read, restricted to `ids` when given.
    /// Returns the IDs that changed.
    pub fn mark_read(&self, user_id: i32, ids: Option<&[i32]>) -> Result<Vec<i32>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let target = notifications
            .filter(notification_fields::user_id.eq(user_id))
            .filter(notification_fields::is_read.eq(false));

        let updated = match ids {
            Some(ids) => dsl::update(target.filter(notification_fields::id.eq_any(ids)))
                .set(notification_fields::is_read.eq(true))
                .returning(notification_fields::id)
                .get_results(&mut db_connection)?,
            None => dsl::update(target)
                .set(notification_fields::is_read.eq(true))
                .returning(notification_fields::id)
                .get_results(&mut db_connection)?,
        };

        Ok(updated)
    }

    pub fn delete_old_read(&self, created_before: DateTime<Utc>) -> Result<usize, DaoError> {
        Ok(dsl::delete(
            notifications
                .filter(notification_fields::is_read.eq(true))
                .filter(notification_fields::created_timestamp.lt(created_before)),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}

impl NotificationSink for Dao {
    fn notify_user(&self, user_id: i32, content: &str) -> Result<i32, DaoError> {
        let new_notification = NewNotification {
            user_id,
            content,
            created_timestamp: Utc::now(),
            is_read: false,
        };

        Ok(dsl::insert_into(notifications)
            .values(&new_notification)
            .returning(notification_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    fn notify_users(&self, user_ids: &[i32], content: &str) -> Result<usize, DaoError> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let new_notifications = user_ids
            .iter()
            .map(|&user_id| NewNotification {
                user_id,
                content,
                created_timestamp: now,
                is_read: false,
            })
            .collect::<Vec<_>>();

        Ok(dsl::insert_into(notifications)
            .values(&new_notifications)
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    fn notify_managers(&self, content: &str) -> Result<usize, DaoError> {
        let managers = users.filter(user_fields::is_manager.eq(true)).select((
            user_fields::id,
            content.into_sql::<Text>(),
            Utc::now().into_sql::<Timestamptz>(),
            false.into_sql::<Bool>(),
        ));

        Ok(dsl::insert_into(notifications)
            .values(managers)
            .into_columns((
                notification_fields::user_id,
                notification_fields::content,
                notification_fields::created_timestamp,
                notification_fields::is_read,
            ))
            .execute(&mut self.db_thread_pool.get()?)?)
    }

    fn notify_department(&self, department_id: i32, content: &str) -> Result<usize, DaoError> {
        let members = department_memberships
            .filter(membership_fields::department_id.eq(department_id))
            .select((
                membership_fields::user_id,
                content.into_sql::<Text>(),
                Utc::now().into_sql::<Timestamptz>(),
                false.into_sql::<Bool>(),
            ));

        Ok(dsl::insert_into(notifications)
            .values(members)
            .into_columns((
                notification_fields::user_id,
                notification_fields::content,
                notification_fields::created_timestamp,
                notification_fields::is_read,
            ))
            .execute(&mut self.db_thread_pool.get()?)?)
    }
}
