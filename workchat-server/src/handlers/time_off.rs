use workchat_common::db::{self, DaoError, DbThreadPool};
use workchat_common::models::time_off_request::{NewTimeOffRequest, TimeOffStatus, TimeOffType};
use workchat_common::notifications::{best_effort, NotificationSink, NotificationTemplate};
use workchat_common::request_io::{InputTimeOffRequest, InputTimeOffStatus, OutputId};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::str::FromStr;

use crate::handlers::{self, error::HttpErrorResponse};
use crate::middleware::auth::Authenticated;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    request: web::Json<InputTimeOffRequest>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let request = request.into_inner();

    let Ok(request_type) = TimeOffType::from_str(&request.request_type) else {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Invalid request type".into(),
        ));
    };

    if request.end_date < request.start_date {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "End date must not be before start date".into(),
        ));
    }

    let user_id = token.claims.user_id;

    let request_id = match web::block(move || {
        let requester = db::user::Dao::new(&db_thread_pool).get_user(user_id)?;

        let request_id =
            db::time_off::Dao::new(&db_thread_pool).create_request(&NewTimeOffRequest {
                user_id,
                start_date: request.start_date,
                end_date: request.end_date,
                request_type: request_type.as_str(),
                reason: request.reason.as_deref(),
                status: TimeOffStatus::Pending.as_str(),
                created_timestamp: Utc::now(),
            })?;

        best_effort(
            "notify managers of time off request",
            db::notification::Dao::new(&db_thread_pool).notify_managers(
                &NotificationTemplate::TimeOffRequested {
                    requester_name: &requester.full_name(),
                    start_date: request.start_date,
                    end_date: request.end_date,
                }
                .render(),
            ),
        );

        Ok::<_, DaoError>(request_id)
    })
    .await?
    {
        Ok(id) => id,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to create time off request".into(),
            ));
        }
    };

    Ok(HttpResponse::Created().json(OutputId { id: request_id }))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = token.claims.user_id;

    let requests = match web::block(move || {
        db::time_off::Dao::new(&db_thread_pool).get_requests_for_user(user_id)
    })
    .await?
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get time off requests".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(requests))
}

pub async fn set_status(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    request_id: web::Path<i32>,
    status: web::Json<InputTimeOffStatus>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let status = match TimeOffStatus::from_str(&status.status) {
        Ok(TimeOffStatus::Pending) | Err(_) => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                "Status must be one of approved, denied, or cancelled".into(),
            ));
        }
        Ok(s) => s,
    };

    let request_id = request_id.into_inner();

    let updated = match web::block(move || {
        let Some(updated) = db::time_off::Dao::new(&db_thread_pool).set_status(request_id, status)?
        else {
            return Ok(None);
        };

        best_effort(
            "notify requester of time off decision",
            db::notification::Dao::new(&db_thread_pool).notify_user(
                updated.user_id,
                &NotificationTemplate::TimeOffDecided {
                    start_date: updated.start_date,
                    end_date: updated.end_date,
                    status: status.as_str(),
                }
                .render(),
            ),
        );

        Ok::<_, DaoError>(Some(updated))
    })
    .await?
    {
        Ok(Some(r)) => r,
        Ok(None) => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Time off request not found".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update time off request".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(updated))
}
