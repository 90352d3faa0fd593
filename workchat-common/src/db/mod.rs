use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use std::fmt;
use std::time::Duration;

pub mod auth;
pub mod availability;
pub mod department;
pub mod job_registry;
pub mod message;
pub mod notification;
pub mod role;
pub mod shift;
pub mod time_off;
pub mod user;

pub type DbThreadPool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(
    database_uri: &str,
    max_db_connections: u32,
    idle_timeout: Duration,
) -> DbThreadPool {
    let db_connection_manager = ConnectionManager::<PgConnection>::new(database_uri);
    diesel::r2d2::Pool::builder()
        .max_size(max_db_connections)
        .idle_timeout(Some(idle_timeout))
        .build(db_connection_manager)
        .expect("Failed to create DB thread pool")
}

#[derive(Debug)]
pub enum DaoError {
    DbThreadPoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
}

impl DaoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DaoError::QueryFailure(diesel::result::Error::NotFound))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _,
            ))
        )
    }
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbThreadPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
        }
    }
}

impl From<r2d2::Error> for DaoError {
    fn from(error: r2d2::Error) -> Self {
        DaoError::DbThreadPoolFailure(error)
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}

#[cfg(test)]
pub mod test_utils {
    use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
    use once_cell::sync::Lazy;
    use std::time::Duration;

    use crate::db::{create_db_thread_pool, DbThreadPool};
    use crate::models::shift::{NewShift, ShiftStatus};
    use crate::models::user::{NewUser, User};
    use crate::threadrand::SecureRng;

    use super::{department, shift, user};

    const DB_USERNAME_VAR: &str = "WORKCHAT_DB_USERNAME";
    const DB_PASSWORD_VAR: &str = "WORKCHAT_DB_PASSWORD";
    const DB_HOSTNAME_VAR: &str = "WORKCHAT_DB_HOSTNAME";
    const DB_PORT_VAR: &str = "WORKCHAT_DB_PORT";
    const DB_NAME_VAR: &str = "WORKCHAT_DB_NAME";
    const DB_MAX_CONNECTIONS_VAR: &str = "WORKCHAT_DB_MAX_CONNECTIONS";

    pub static DB_THREAD_POOL: Lazy<DbThreadPool> = Lazy::new(|| {
        let username = env_or_panic(DB_USERNAME_VAR);
        let password = env_or_panic(DB_PASSWORD_VAR);
        let hostname = env_or_panic(DB_HOSTNAME_VAR);
        let port = env_or_panic(DB_PORT_VAR);
        let db_name = env_or_panic(DB_NAME_VAR);

        let max_connections = env_or_parse(DB_MAX_CONNECTIONS_VAR, 16u32);

        let db_uri = format!(
            "postgres://{}:{}@{}:{}/{}",
            username, password, hostname, port, db_name
        );

        create_db_thread_pool(&db_uri, max_connections, Duration::from_secs(30))
    });

    pub fn db_pool() -> &'static DbThreadPool {
        &DB_THREAD_POOL
    }

    pub fn unique_email() -> String {
        format!("db-test-{}@workchat.test", SecureRng::next_u128())
    }

    pub fn create_user(is_manager: bool) -> User {
        let email = unique_email();
        let new_user = NewUser {
            email: &email,
            first_name: "Test",
            last_name: "User",
            phone_number: None,
            password_hash: "not-a-real-hash",
            is_manager,
            created_timestamp: Utc::now(),
        };

        let user_dao = user::Dao::new(db_pool());
        let user_id = user_dao
            .create_user(&new_user)
            .expect("Failed to create test user");

        user_dao.get_user(user_id).expect("Failed to fetch test user")
    }

    pub fn unique_name(prefix: &str) -> String {
        format!("{prefix} {}", SecureRng::next_u128())
    }

    pub fn create_department() -> i32 {
        let name = unique_name("Department");
        department::Dao::new(db_pool())
            .create_department(&name, None)
            .expect("Failed to create test department")
    }

    pub fn add_member(user_id: i32, department_id: i32) {
        department::Dao::new(db_pool())
            .add_member(user_id, department_id)
            .expect("Failed to add test department member");
    }

    /// A whole hour at least a day in the future, so tests never race the clock.
    pub fn future_hour(hours_from_base: i64) -> DateTime<Utc> {
        let base = (Utc::now() + ChronoDuration::days(2))
            .duration_trunc(ChronoDuration::days(1))
            .expect("Failed to truncate timestamp");

        base + ChronoDuration::hours(hours_from_base)
    }

    pub fn create_shift(
        department_id: i32,
        scheduled_by_id: i32,
        user_id: Option<i32>,
        status: ShiftStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> i32 {
        let new_shift = NewShift {
            start_time: start,
            end_time: end,
            department_id,
            scheduled_by_id,
            user_id,
            status,
        };

        shift::Dao::new(db_pool())
            .create_shift(&new_shift)
            .expect("Failed to create test shift")
    }

    fn env_or_panic(key: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| panic!("Environment variable {key} must be set"))
    }

    fn env_or_parse<T>(key: &str, default: T) -> T
    where
        T: std::str::FromStr,
    {
        std::env::var(key)
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(default)
    }
}
