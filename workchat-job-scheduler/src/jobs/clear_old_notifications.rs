use workchat_common::db::notification::Dao as NotificationDao;
use workchat_common::db::DbThreadPool;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::jobs::{Job, JobError};

/// Deletes notifications that have been read and are older than the retention window.
/// Unread notifications are kept regardless of age.
pub struct ClearOldNotificationsJob {
    retention: Duration,
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearOldNotificationsJob {
    pub fn new(retention: Duration, db_thread_pool: DbThreadPool) -> Self {
        Self {
            retention,
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearOldNotificationsJob {
    fn name(&self) -> &'static str {
        "Clear Old Notifications"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let cutoff = Utc::now() - self.retention;
        let dao = NotificationDao::new(&self.db_thread_pool);
        let result = tokio::task::spawn_blocking(move || dao.delete_old_read(cutoff)).await;

        self.is_running = false;

        let deleted = result??;
        if deleted > 0 {
            log::info!("Deleted {deleted} read notifications created before {cutoff}");
        }

        Ok(())
    }
}
