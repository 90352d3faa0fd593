use diesel::{dsl, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::db::{DaoError, DbThreadPool};
use crate::models::job_run::JobRun;
use crate::schema::job_registry as job_registry_fields;
use crate::schema::job_registry::dsl::job_registry;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn get_job_last_run_timestamp(&self, name: &str) -> Result<Option<SystemTime>, DaoError> {
        Ok(job_registry
            .select(job_registry_fields::last_run_timestamp)
            .find(name)
            .get_result(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    pub fn set_job_last_run_timestamp(
        &self,
        job_name: &str,
        timestamp: SystemTime,
    ) -> Result<(), DaoError> {
        let run = JobRun {
            job_name,
            last_run_timestamp: timestamp,
        };

        dsl::insert_into(job_registry)
            .values(&run)
            .on_conflict(job_registry_fields::job_name)
            .do_update()
            .set(&run)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, UNIX_EPOCH};

    use crate::db::test_utils;
    use crate::threadrand::SecureRng;

    #[test]
    fn test_last_run_is_upserted() {
        let dao = Dao::new(test_utils::db_pool());
        let job_name = format!("Test Job {}", SecureRng::next_u128());

        assert!(dao.get_job_last_run_timestamp(&job_name).unwrap().is_none());

        // Postgres keeps microseconds, so compare at whole-second precision
        let first = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        dao.set_job_last_run_timestamp(&job_name, first).unwrap();
        assert_eq!(
            dao.get_job_last_run_timestamp(&job_name).unwrap(),
            Some(first)
        );

        let second = first + Duration::from_secs(3600);
        dao.set_job_last_run_timestamp(&job_name, second).unwrap();
        assert_eq!(
            dao.get_job_last_run_timestamp(&job_name).unwrap(),
            Some(second)
        );
    }
}
