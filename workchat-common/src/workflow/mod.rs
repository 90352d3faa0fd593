//! Shift lifecycle operations that combine several DAO calls with ownership, status and
//! schedule checks. Each operation is synchronous and is expected to run on a blocking
//! thread.

pub mod assignment;
pub mod exchange;

use std::fmt;

use crate::db::DaoError;

#[derive(Debug)]
pub enum WorkflowError {
    NoDepartmentAssigned,
    ShiftNotFound,
    InvalidState,
    /// `lost_race` is set when the shift passed the availability check but another
    /// claim changed it before the update landed.
    ShiftNotAvailable { lost_race: bool },
    CannotClaimOwnShift,
    NotAuthorizedForDepartment,
    ScheduleConflict,
    UserNotFound,
    AlreadyUnassigned,
    /// The shift is completed or cancelled and can no longer change hands.
    ShiftClosed,
    Dao(DaoError),
}

impl std::error::Error for WorkflowError {}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::NoDepartmentAssigned => {
                write!(f, "WorkflowError: User is not in any department")
            }
            WorkflowError::ShiftNotFound => write!(f, "WorkflowError: Shift not found"),
            WorkflowError::InvalidState => {
                write!(f, "WorkflowError: Shift status does not allow the operation")
            }
            WorkflowError::ShiftNotAvailable { lost_race } => write!(
                f,
                "WorkflowError: Shift not available for pickup (lost race: {lost_race})"
            ),
            WorkflowError::CannotClaimOwnShift => {
                write!(f, "WorkflowError: Cannot pick up own shift")
            }
            WorkflowError::NotAuthorizedForDepartment => {
                write!(f, "WorkflowError: User is not in the shift's department")
            }
            WorkflowError::ScheduleConflict => write!(f, "WorkflowError: Schedule conflict"),
            WorkflowError::UserNotFound => write!(f, "WorkflowError: User not found"),
            WorkflowError::AlreadyUnassigned => {
                write!(f, "WorkflowError: Shift is already unassigned")
            }
            WorkflowError::ShiftClosed => {
                write!(f, "WorkflowError: Shift is completed or cancelled")
            }
            WorkflowError::Dao(e) => write!(f, "WorkflowError: {e}"),
        }
    }
}

impl From<DaoError> for WorkflowError {
    fn from(error: DaoError) -> Self {
        WorkflowError::Dao(error)
    }
}
