pub mod templates;

pub use templates::NotificationTemplate;

use crate::db::DaoError;

/// Append-only store of user-facing notifications.
///
/// Every operation is a pure insert. Callers treat failures as non-fatal: a notification
/// that could not be written is logged and the triggering operation still succeeds.
pub trait NotificationSink: Send + Sync {
    /// Returns the ID of the new notification.
    fn notify_user(&self, user_id: i32, content: &str) -> Result<i32, DaoError>;

    /// Returns the number of notifications written.
    fn notify_users(&self, user_ids: &[i32], content: &str) -> Result<usize, DaoError>;

    /// Notifies every user flagged as a manager.
    fn notify_managers(&self, content: &str) -> Result<usize, DaoError>;

    /// Notifies every member of the department.
    fn notify_department(&self, department_id: i32, content: &str) -> Result<usize, DaoError>;
}

/// Runs a notification write, logging instead of propagating failures.
pub fn best_effort<T>(what: &str, result: Result<T, DaoError>) -> Option<T> {
    match result {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("Failed to {what}: {e}");
            None
        }
    }
}
