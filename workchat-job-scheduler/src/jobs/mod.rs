mod clear_expired_password_resets;
mod clear_old_notifications;
mod complete_past_shifts;

pub use clear_expired_password_resets::ClearExpiredPasswordResetsJob;
pub use clear_old_notifications::ClearOldNotificationsJob;
pub use complete_past_shifts::CompletePastShiftsJob;

use workchat_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(DaoError),
    ConcurrencyError(JoinError),
}

impl std::error::Error for JobError {}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => write!(f, "JobError: {e}"),
            JobError::ConcurrencyError(e) => write!(f, "JobError: ConcurrencyError: {e}"),
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(e)
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}
