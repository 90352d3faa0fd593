use workchat_common::db::shift::Dao as ShiftDao;
use workchat_common::db::DbThreadPool;

use async_trait::async_trait;
use chrono::Utc;

use crate::jobs::{Job, JobError};

pub struct CompletePastShiftsJob {
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl CompletePastShiftsJob {
    pub fn new(db_thread_pool: DbThreadPool) -> Self {
        Self {
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for CompletePastShiftsJob {
    fn name(&self) -> &'static str {
        "Complete Past Shifts"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let dao = ShiftDao::new(&self.db_thread_pool);
        let result = tokio::task::spawn_blocking(move || dao.complete_past_shifts(Utc::now())).await;

        self.is_running = false;

        let completed = result??;
        if completed > 0 {
            log::info!("Marked {completed} past shifts as completed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use workchat_common::db;
    use workchat_common::models::shift::{NewShift, ShiftStatus};
    use workchat_common::threadrand::SecureRng;

    use chrono::Duration;

    use crate::env;
    use crate::jobs::testing;

    #[tokio::test]
    async fn test_execute() {
        let pool = &env::testing::DB_THREAD_POOL;
        let manager = testing::create_user();
        let employee = testing::create_user();
        let department_id = db::department::Dao::new(pool)
            .create_department(&format!("Job Dept {}", SecureRng::next_u128()), None)
            .unwrap();

        let shift_dao = db::shift::Dao::new(pool);
        let now = Utc::now();

        let create = |status: ShiftStatus, ends_in: Duration, user_id: Option<i32>| {
            shift_dao
                .create_shift(&NewShift {
                    start_time: now + ends_in - Duration::hours(8),
                    end_time: now + ends_in,
                    department_id,
                    scheduled_by_id: manager.id,
                    user_id,
                    status,
                })
                .unwrap()
        };

        let past_scheduled = create(ShiftStatus::Scheduled, Duration::hours(-1), Some(employee.id));
        let past_available = create(
            ShiftStatus::AvailableForExchange,
            Duration::minutes(-5),
            Some(employee.id),
        );
        let past_cancelled = create(ShiftStatus::Cancelled, Duration::hours(-2), None);
        let ongoing = create(ShiftStatus::Scheduled, Duration::hours(2), Some(employee.id));

        let mut job = CompletePastShiftsJob::new((*pool).clone());
        assert!(job.is_ready());
        job.execute().await.unwrap();
        assert!(job.is_ready());

        let status = |id: i32| shift_dao.get_shift(id).unwrap().status;
        assert_eq!(status(past_scheduled), ShiftStatus::Completed);
        assert_eq!(status(past_available), ShiftStatus::Completed);
        assert_eq!(status(past_cancelled), ShiftStatus::Cancelled);
        assert_eq!(status(ongoing), ShiftStatus::Scheduled);
    }
}
