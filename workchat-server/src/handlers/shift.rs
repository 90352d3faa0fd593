use workchat_common::db::shift::ShiftFilter;
use workchat_common::db::{self, DaoError, DbThreadPool};
use workchat_common::models::shift::{NewShift, ShiftStatus};
use workchat_common::notifications::{best_effort, NotificationSink, NotificationTemplate};
use workchat_common::request_io::{
    InputShift, OutputId, OutputMessage, OutputShiftPage, Pagination, ShiftQuery,
};

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::handlers::{self, error::HttpErrorResponse};
use crate::middleware::auth::Authenticated;

const DEFAULT_PAGE_LIMIT: i64 = 100;

enum CreateShiftError {
    ScheduleConflict,
    Dao(DaoError),
}

impl From<DaoError> for CreateShiftError {
    fn from(e: DaoError) -> Self {
        CreateShiftError::Dao(e)
    }
}

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    shift_data: web::Json<InputShift>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    if shift_data.end_time <= shift_data.start_time {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "End time must be after start time".into(),
        ));
    }

    let status = shift_data
        .status
        .parse::<ShiftStatus>()
        .map_err(|e| HttpErrorResponse::IncorrectlyFormed(e.to_string().into()))?;

    if status.is_terminal() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "A new shift must be scheduled or available_for_exchange".into(),
        ));
    }

    let new_shift = NewShift {
        start_time: shift_data.start_time,
        end_time: shift_data.end_time,
        department_id: shift_data.department_id,
        scheduled_by_id: token.claims.user_id,
        user_id: shift_data.user_id,
        status,
    };

    let result = web::block(move || {
        let shift_dao = db::shift::Dao::new(&db_thread_pool);

        if let Some(user_id) = new_shift.user_id {
            if shift_dao.has_conflict(user_id, new_shift.start_time, new_shift.end_time, 0)? {
                return Err(CreateShiftError::ScheduleConflict);
            }
        }

        let shift_id = shift_dao.create_shift(&new_shift)?;

        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        match new_shift.user_id {
            Some(user_id) => {
                best_effort(
                    "notify user of new shift",
                    notification_dao.notify_user(
                        user_id,
                        &NotificationTemplate::ShiftCreatedForUser {
                            start: new_shift.start_time,
                            end: new_shift.end_time,
                        }
                        .render(),
                    ),
                );
            }
            None => {
                best_effort(
                    "notify department of new shift",
                    notification_dao.notify_department(
                        new_shift.department_id,
                        &NotificationTemplate::ShiftAvailable {
                            start: new_shift.start_time,
                            end: new_shift.end_time,
                        }
                        .render(),
                    ),
                );
            }
        }

        Ok(shift_id)
    })
    .await?;

    match result {
        Ok(shift_id) => Ok(HttpResponse::Created().json(OutputId { id: shift_id })),
        Err(CreateShiftError::ScheduleConflict) => Err(HttpErrorResponse::ConflictWithExisting(
            "Schedule conflict detected".into(),
        )),
        Err(CreateShiftError::Dao(e)) if e.is_foreign_key_violation() => Err(
            HttpErrorResponse::DoesNotExist("Department or user not found".into()),
        ),
        Err(CreateShiftError::Dao(e)) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to create shift".into(),
            ))
        }
    }
}

pub async fn list(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
    query: web::Query<ShiftQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    shift_page(db_thread_pool, query.into_inner()).await
}

/// One page of the shifts matching `query`, ordered by start time.
pub(crate) async fn shift_page(
    db_thread_pool: web::Data<DbThreadPool>,
    query: ShiftQuery,
) -> Result<HttpResponse, HttpErrorResponse> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            s.parse::<ShiftStatus>()
                .map_err(|e| HttpErrorResponse::IncorrectlyFormed(e.to_string().into()))?,
        ),
        None => None,
    };

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);

    if limit < 0 || offset < 0 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "limit and offset must not be negative".into(),
        ));
    }

    let filter = ShiftFilter {
        department_id: query.department_id,
        user_id: query.user_id,
        status,
        starts_at_or_after: query.start_date,
        ends_at_or_before: query.end_date,
    };

    let (shifts, total) = match web::block(move || {
        db::shift::Dao::new(&db_thread_pool).list_shifts(&filter, limit, offset)
    })
    .await?
    {
        Ok(page) => page,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get shifts".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(OutputShiftPage {
        shifts,
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: None,
        },
    }))
}

pub async fn next(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = token.claims.user_id;

    let next_shift = match web::block(move || {
        db::shift::Dao::new(&db_thread_pool).get_next_shift(user_id, Utc::now())
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get next shift".into(),
            ));
        }
    };

    match next_shift {
        Some(shift) => Ok(HttpResponse::Ok().json(shift)),
        None => Err(HttpErrorResponse::DoesNotExist(
            "No upcoming shifts found for this user".into(),
        )),
    }
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
    shift_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let shift_id = shift_id.into_inner();

    match web::block(move || db::shift::Dao::new(&db_thread_pool).get_shift_details(shift_id))
        .await?
    {
        Ok(details) => Ok(HttpResponse::Ok().json(details)),
        Err(e) if e.is_not_found() => {
            Err(HttpErrorResponse::DoesNotExist("Shift not found".into()))
        }
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to get shift".into(),
            ))
        }
    }
}

pub async fn cancel(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    shift_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let shift_id = shift_id.into_inner();

    let cancelled = match web::block(move || {
        let Some(shift) = db::shift::Dao::new(&db_thread_pool).cancel(shift_id)? else {
            return Ok(false);
        };

        if let Some(holder_id) = shift.user_id {
            best_effort(
                "notify holder of cancelled shift",
                db::notification::Dao::new(&db_thread_pool).notify_user(
                    holder_id,
                    &NotificationTemplate::ShiftCancelled {
                        start: shift.start_time,
                    }
                    .render(),
                ),
            );
        }

        Ok::<_, DaoError>(true)
    })
    .await?
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to cancel shift".into(),
            ));
        }
    };

    if !cancelled {
        return Err(HttpErrorResponse::DoesNotExist("Shift not found".into()));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Shift cancelled successfully",
    }))
}
