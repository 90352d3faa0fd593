use workchat_common::db::auth::Dao as AuthDao;
use workchat_common::db::DbThreadPool;

use async_trait::async_trait;

use crate::jobs::{Job, JobError};

pub struct ClearExpiredPasswordResetsJob {
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearExpiredPasswordResetsJob {
    pub fn new(db_thread_pool: DbThreadPool) -> Self {
        Self {
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredPasswordResetsJob {
    fn name(&self) -> &'static str {
        "Clear Expired Password Resets"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let dao = AuthDao::new(&self.db_thread_pool);
        let result =
            tokio::task::spawn_blocking(move || dao.delete_expired_password_resets()).await;

        self.is_running = false;
        result??;

        Ok(())
    }
}
