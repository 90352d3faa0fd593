use diesel::{AsChangeset, Insertable};
use std::time::SystemTime;

use crate::schema::job_registry;

/// The latest run of a scheduled job. Written as an upsert keyed on the job's name.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = job_registry, primary_key(job_name))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRun<'a> {
    pub job_name: &'a str,
    pub last_run_timestamp: SystemTime,
}
