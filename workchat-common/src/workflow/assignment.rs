use crate::db::{department, shift, user, DbThreadPool};
use crate::models::shift::Shift;
use crate::notifications::{best_effort, NotificationSink, NotificationTemplate};
use crate::workflow::WorkflowError;

fn load_shift(shift_dao: &shift::Dao, shift_id: i32) -> Result<Shift, WorkflowError> {
    match shift_dao.get_shift(shift_id) {
        Ok(s) => Ok(s),
        Err(e) if e.is_not_found() => Err(WorkflowError::ShiftNotFound),
        Err(e) => Err(e.into()),
    }
}

/// Gives the shift to `user_id` and marks it scheduled. Completed and cancelled shifts
/// are left alone.
///
/// A previous holder is told about the reassignment before the shift changes hands.
/// Afterwards the new holder and the department's managers are notified.
pub fn assign(
    db_thread_pool: &DbThreadPool,
    notifications: &dyn NotificationSink,
    shift_id: i32,
    user_id: i32,
) -> Result<(), WorkflowError> {
    let shift_dao = shift::Dao::new(db_thread_pool);
    let shift = load_shift(&shift_dao, shift_id)?;

    if shift.status.is_terminal() {
        return Err(WorkflowError::ShiftClosed);
    }

    let assignee = match user::Dao::new(db_thread_pool).get_user(user_id) {
        Ok(u) => u,
        Err(e) if e.is_not_found() => return Err(WorkflowError::UserNotFound),
        Err(e) => return Err(e.into()),
    };

    if shift_dao.has_conflict(user_id, shift.start_time, shift.end_time, shift.id)? {
        return Err(WorkflowError::ScheduleConflict);
    }

    let assignee_name = assignee.full_name();

    if let Some(previous_holder) = shift.user_id.filter(|&id| id != user_id) {
        let content = NotificationTemplate::ShiftReassigned {
            start: shift.start_time,
            end: shift.end_time,
            new_holder_name: &assignee_name,
        }
        .render();

        best_effort(
            "notify previous holder of reassignment",
            notifications.notify_user(previous_holder, &content),
        );
    }

    // Zero rows means the shift was completed or cancelled after it was loaded
    if shift_dao.assign(shift_id, user_id)? == 0 {
        return Err(WorkflowError::ShiftClosed);
    }

    let department_dao = department::Dao::new(db_thread_pool);
    let department_name = best_effort(
        "load department name for assignment notification",
        department_dao.get_department(shift.department_id),
    )
    .map(|d| d.name);

    let content = NotificationTemplate::ShiftAssigned {
        start: shift.start_time,
        end: shift.end_time,
        department_name: department_name.as_deref(),
    }
    .render();

    best_effort(
        "notify assignee of shift",
        notifications.notify_user(user_id, &content),
    );

    let manager_ids = best_effort(
        "load department managers",
        department_dao.get_manager_ids(shift.department_id),
    )
    .unwrap_or_default()
    .into_iter()
    .filter(|&id| id != user_id)
    .collect::<Vec<_>>();

    if !manager_ids.is_empty() {
        let content = NotificationTemplate::CoworkerAssigned {
            start: shift.start_time,
            end: shift.end_time,
            holder_name: &assignee_name,
        }
        .render();

        best_effort(
            "notify managers of assignment",
            notifications.notify_users(&manager_ids, &content),
        );
    }

    Ok(())
}

/// Removes the holder from the shift and puts it in the exchange pool.
pub fn unassign(
    db_thread_pool: &DbThreadPool,
    notifications: &dyn NotificationSink,
    shift_id: i32,
) -> Result<(), WorkflowError> {
    let shift_dao = shift::Dao::new(db_thread_pool);
    let shift = load_shift(&shift_dao, shift_id)?;

    if shift.status.is_terminal() {
        return Err(WorkflowError::ShiftClosed);
    }

    let Some(previous_holder) = shift.user_id else {
        return Err(WorkflowError::AlreadyUnassigned);
    };

    if shift_dao.unassign(shift_id)? == 0 {
        return Err(WorkflowError::ShiftClosed);
    }

    let content = NotificationTemplate::ShiftUnassigned {
        start: shift.start_time,
    }
    .render();

    best_effort(
        "notify holder of unassignment",
        notifications.notify_user(previous_holder, &content),
    );

    let content = NotificationTemplate::ShiftAvailable {
        start: shift.start_time,
        end: shift.end_time,
    }
    .render();

    best_effort(
        "notify department of unassigned shift",
        notifications.notify_department(shift.department_id, &content),
    );

    Ok(())
}
