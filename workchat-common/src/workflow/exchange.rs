use chrono::Utc;

use crate::db::{department, shift, user, DbThreadPool};
use crate::models::shift::{AvailableShift, ShiftStatus};
use crate::notifications::{best_effort, NotificationSink, NotificationTemplate};
use crate::workflow::WorkflowError;

/// Future shifts in the user's departments that are open for exchange or unassigned.
pub fn list_available_shifts(
    db_thread_pool: &DbThreadPool,
    user_id: i32,
) -> Result<Vec<AvailableShift>, WorkflowError> {
    let department_ids = user::Dao::new(db_thread_pool).get_user_department_ids(user_id)?;

    if department_ids.is_empty() {
        return Err(WorkflowError::NoDepartmentAssigned);
    }

    Ok(shift::Dao::new(db_thread_pool).get_available_shifts(&department_ids, Utc::now())?)
}

/// Puts a scheduled shift held by `user_id` into the exchange pool. The user stays the
/// holder until someone picks the shift up. The department is told the shift is open.
pub fn relinquish(
    db_thread_pool: &DbThreadPool,
    notifications: &dyn NotificationSink,
    user_id: i32,
    shift_id: i32,
) -> Result<(), WorkflowError> {
    let shift_dao = shift::Dao::new(db_thread_pool);

    let shift = match shift_dao.get_shift(shift_id) {
        Ok(s) => s,
        Err(e) if e.is_not_found() => return Err(WorkflowError::ShiftNotFound),
        Err(e) => return Err(e.into()),
    };

    if shift.user_id != Some(user_id) {
        return Err(WorkflowError::ShiftNotFound);
    }

    if shift.status != ShiftStatus::Scheduled {
        return Err(WorkflowError::InvalidState);
    }

    if shift_dao.mark_available_if_scheduled(shift_id, user_id)? == 0 {
        return Err(WorkflowError::InvalidState);
    }

    let content = NotificationTemplate::ShiftAvailable {
        start: shift.start_time,
        end: shift.end_time,
    }
    .render();

    best_effort(
        "notify department of relinquished shift",
        notifications.notify_department(shift.department_id, &content),
    );

    Ok(())
}

/// Claims an exchange-pool shift for `user_id`.
///
/// Checks run in a fixed order and the first failure is returned:
/// 1. the shift exists and is available for exchange,
/// 2. the user is not its current holder,
/// 3. the user belongs to the shift's department,
/// 4. the user holds no other shift overlapping it (shared instants count).
///
/// The final update re-checks availability, so if two users claim the same shift at once
/// exactly one succeeds and the other gets `ShiftNotAvailable { lost_race: true }`.
pub fn pickup(
    db_thread_pool: &DbThreadPool,
    user_id: i32,
    shift_id: i32,
) -> Result<(), WorkflowError> {
    let shift_dao = shift::Dao::new(db_thread_pool);

    let shift = match shift_dao.get_shift(shift_id) {
        Ok(s) if s.status == ShiftStatus::AvailableForExchange => s,
        Ok(_) => return Err(WorkflowError::ShiftNotAvailable { lost_race: false }),
        Err(e) if e.is_not_found() => {
            return Err(WorkflowError::ShiftNotAvailable { lost_race: false })
        }
        Err(e) => return Err(e.into()),
    };

    if shift.user_id == Some(user_id) {
        return Err(WorkflowError::CannotClaimOwnShift);
    }

    if !department::Dao::new(db_thread_pool).is_member(user_id, shift.department_id)? {
        return Err(WorkflowError::NotAuthorizedForDepartment);
    }

    if shift_dao.has_conflict(user_id, shift.start_time, shift.end_time, shift.id)? {
        return Err(WorkflowError::ScheduleConflict);
    }

    if shift_dao.claim_if_available(shift_id, user_id)? == 0 {
        return Err(WorkflowError::ShiftNotAvailable { lost_race: true });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::db::test_utils::{self, future_hour};
    use crate::notifications::testing::{Recorded, RecordingSink};

    struct Team {
        manager_id: i32,
        department_id: i32,
    }

    fn new_team() -> Team {
        let manager = test_utils::create_user(true);
        let department_id = test_utils::create_department();
        test_utils::add_member(manager.id, department_id);

        Team {
            manager_id: manager.id,
            department_id,
        }
    }

    fn member_of(team: &Team) -> i32 {
        let user = test_utils::create_user(false);
        test_utils::add_member(user.id, team.department_id);
        user.id
    }

    fn shift_for(team: &Team, user_id: Option<i32>, status: ShiftStatus, start: i64, end: i64) -> i32 {
        test_utils::create_shift(
            team.department_id,
            team.manager_id,
            user_id,
            status,
            future_hour(start),
            future_hour(end),
        )
    }

    fn load(shift_id: i32) -> crate::models::shift::Shift {
        shift::Dao::new(test_utils::db_pool())
            .get_shift(shift_id)
            .unwrap()
    }

    #[test]
    fn test_relinquish_keeps_holder() {
        let team = new_team();
        let holder = member_of(&team);
        let shift_id = shift_for(&team, Some(holder), ShiftStatus::Scheduled, 9, 17);
        let sink = RecordingSink::default();

        relinquish(test_utils::db_pool(), &sink, holder, shift_id).unwrap();

        let shift = load(shift_id);
        assert_eq!(shift.status, ShiftStatus::AvailableForExchange);
        assert_eq!(shift.user_id, Some(holder));

        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Recorded::Department(department_id, content) => {
                assert_eq!(*department_id, team.department_id);
                assert!(content.starts_with("A new shift is available: "));
            }
            other => panic!("Unexpected notification: {other:?}"),
        }
    }

    #[test]
    fn test_relinquish_succeeds_when_notification_fails() {
        let team = new_team();
        let holder = member_of(&team);
        let shift_id = shift_for(&team, Some(holder), ShiftStatus::Scheduled, 9, 17);

        relinquish(
            test_utils::db_pool(),
            &RecordingSink::failing(),
            holder,
            shift_id,
        )
        .unwrap();

        assert_eq!(load(shift_id).status, ShiftStatus::AvailableForExchange);
    }

    #[test]
    fn test_relinquish_rejections() {
        let team = new_team();
        let holder = member_of(&team);
        let other = member_of(&team);
        let sink = RecordingSink::default();
        let pool = test_utils::db_pool();

        let shift_id = shift_for(&team, Some(holder), ShiftStatus::Scheduled, 9, 17);
        assert!(matches!(
            relinquish(pool, &sink, other, shift_id),
            Err(WorkflowError::ShiftNotFound)
        ));
        assert!(matches!(
            relinquish(pool, &sink, holder, -1),
            Err(WorkflowError::ShiftNotFound)
        ));

        let completed = shift_for(&team, Some(holder), ShiftStatus::Completed, 20, 22);
        assert!(matches!(
            relinquish(pool, &sink, holder, completed),
            Err(WorkflowError::InvalidState)
        ));
        assert_eq!(load(completed).status, ShiftStatus::Completed);

        // An unassigned shift created straight into the pool belongs to nobody
        let open = shift_for(&team, None, ShiftStatus::AvailableForExchange, 30, 32);
        assert!(matches!(
            relinquish(pool, &sink, holder, open),
            Err(WorkflowError::ShiftNotFound)
        ));

        // Relinquishing twice finds the shift already in the pool
        relinquish(pool, &sink, holder, shift_id).unwrap();
        assert!(matches!(
            relinquish(pool, &sink, holder, shift_id),
            Err(WorkflowError::InvalidState)
        ));

        assert_eq!(sink.calls().len(), 1);
    }

    #[test]
    fn test_pickup_of_unavailable_shift_changes_nothing() {
        let team = new_team();
        let holder = member_of(&team);
        let claimer = member_of(&team);
        let pool = test_utils::db_pool();

        for status in [
            ShiftStatus::Scheduled,
            ShiftStatus::Completed,
            ShiftStatus::Cancelled,
        ] {
            let shift_id = shift_for(&team, Some(holder), status, 9, 17);

            assert!(matches!(
                pickup(pool, claimer, shift_id),
                Err(WorkflowError::ShiftNotAvailable { lost_race: false })
            ));

            let shift = load(shift_id);
            assert_eq!(shift.status, status);
            assert_eq!(shift.user_id, Some(holder));
        }

        assert!(matches!(
            pickup(pool, claimer, -1),
            Err(WorkflowError::ShiftNotAvailable { lost_race: false })
        ));
    }

    #[test]
    fn test_pickup_transfers_shift() {
        let team = new_team();
        let holder = member_of(&team);
        let claimer = member_of(&team);
        let pool = test_utils::db_pool();

        let shift_id = shift_for(&team, Some(holder), ShiftStatus::Scheduled, 9, 17);
        relinquish(pool, &RecordingSink::default(), holder, shift_id).unwrap();

        assert!(matches!(
            pickup(pool, holder, shift_id),
            Err(WorkflowError::CannotClaimOwnShift)
        ));

        pickup(pool, claimer, shift_id).unwrap();

        let shift = load(shift_id);
        assert_eq!(shift.status, ShiftStatus::Scheduled);
        assert_eq!(shift.user_id, Some(claimer));
    }

    #[test]
    fn test_pickup_requires_department_membership() {
        let team = new_team();
        let outsider = test_utils::create_user(false);
        let other_team = new_team();
        test_utils::add_member(outsider.id, other_team.department_id);
        let pool = test_utils::db_pool();

        let unassigned = shift_for(&team, None, ShiftStatus::AvailableForExchange, 9, 17);
        let relinquished = shift_for(
            &team,
            Some(member_of(&team)),
            ShiftStatus::AvailableForExchange,
            20,
            22,
        );

        for shift_id in [unassigned, relinquished] {
            assert!(matches!(
                pickup(pool, outsider.id, shift_id),
                Err(WorkflowError::NotAuthorizedForDepartment)
            ));
        }

        assert!(load(unassigned).user_id.is_none());
    }

    #[test]
    fn test_pickup_conflicts_on_overlap_and_shared_boundary() {
        let team = new_team();
        let claimer = member_of(&team);
        let pool = test_utils::db_pool();

        shift_for(&team, Some(claimer), ShiftStatus::Scheduled, 10, 14);

        let overlapping = shift_for(&team, None, ShiftStatus::AvailableForExchange, 13, 15);
        let touching = shift_for(&team, None, ShiftStatus::AvailableForExchange, 14, 16);
        let clear = shift_for(&team, None, ShiftStatus::AvailableForExchange, 15, 17);

        assert!(matches!(
            pickup(pool, claimer, overlapping),
            Err(WorkflowError::ScheduleConflict)
        ));
        assert!(matches!(
            pickup(pool, claimer, touching),
            Err(WorkflowError::ScheduleConflict)
        ));
        assert!(load(touching).user_id.is_none());

        pickup(pool, claimer, clear).unwrap();
        assert_eq!(load(clear).user_id, Some(claimer));
    }

    #[test]
    fn test_relinquished_shift_still_blocks_its_holder() {
        let team = new_team();
        let holder = member_of(&team);
        let pool = test_utils::db_pool();

        let own = shift_for(&team, Some(holder), ShiftStatus::Scheduled, 10, 14);
        relinquish(pool, &RecordingSink::default(), holder, own).unwrap();

        let overlapping = shift_for(&team, None, ShiftStatus::AvailableForExchange, 12, 13);
        assert!(matches!(
            pickup(pool, holder, overlapping),
            Err(WorkflowError::ScheduleConflict)
        ));
    }

    #[test]
    fn test_concurrent_pickups_have_one_winner() {
        let team = new_team();
        let claimers = [member_of(&team), member_of(&team)];
        let shift_id = shift_for(&team, None, ShiftStatus::AvailableForExchange, 9, 17);

        let barrier = Arc::new(Barrier::new(claimers.len()));

        let handles = claimers
            .iter()
            .map(|&claimer| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    pickup(test_utils::db_pool(), claimer, shift_id)
                })
            })
            .collect::<Vec<_>>();

        let results = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loser,
            Err(WorkflowError::ShiftNotAvailable { .. })
        ));

        let shift = load(shift_id);
        assert_eq!(shift.status, ShiftStatus::Scheduled);
        assert!(claimers.contains(&shift.user_id.unwrap()));
    }

    #[test]
    fn test_list_available_shifts() {
        let team = new_team();
        let employee = member_of(&team);
        let loner = test_utils::create_user(false);
        let pool = test_utils::db_pool();

        assert!(matches!(
            list_available_shifts(pool, loner.id),
            Err(WorkflowError::NoDepartmentAssigned)
        ));

        let open = shift_for(&team, None, ShiftStatus::AvailableForExchange, 9, 17);
        shift_for(&team, Some(employee), ShiftStatus::Scheduled, 20, 22);

        let available = list_available_shifts(pool, employee).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, open);
        assert_eq!(available[0].department_id, team.department_id);
    }
}
