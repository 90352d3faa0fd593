use workchat_common::db::{self, DbThreadPool};
use workchat_common::request_io::{
    InputShiftAssignment, InputShiftId, OutputAvailableShifts, OutputMessage,
    OutputShiftAssignment,
};
use workchat_common::workflow::{assignment, exchange, WorkflowError};

use actix_web::{web, HttpResponse};

use crate::handlers::{self, error::HttpErrorResponse};
use crate::middleware::auth::Authenticated;

pub async fn list_available(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = token.claims.user_id;

    let shifts =
        web::block(move || exchange::list_available_shifts(&db_thread_pool, user_id)).await??;

    Ok(HttpResponse::Ok().json(OutputAvailableShifts {
        total: shifts.len(),
        shifts,
    }))
}

pub async fn relinquish(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    body: web::Json<InputShiftId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let Some(shift_id) = body.shift_id else {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Missing shift_id".into(),
        ));
    };

    let user_id = token.claims.user_id;

    let result = web::block(move || {
        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        exchange::relinquish(&db_thread_pool, &notification_dao, user_id, shift_id)
    })
    .await?;

    match result {
        Ok(()) => Ok(HttpResponse::Ok().json(OutputMessage {
            message: "Shift successfully marked as available for exchange",
        })),
        Err(WorkflowError::ShiftNotFound) => Err(HttpErrorResponse::DoesNotExist(
            "Shift not found or does not belong to user".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn pickup(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    body: web::Json<InputShiftId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let Some(shift_id) = body.shift_id else {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Missing shift_id".into(),
        ));
    };

    let user_id = token.claims.user_id;

    web::block(move || exchange::pickup(&db_thread_pool, user_id, shift_id)).await??;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Shift successfully picked up",
    }))
}

pub async fn assign(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    body: web::Json<InputShiftAssignment>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let (Some(shift_id), Some(user_id)) = (body.shift_id, body.user_id) else {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "shift_id and user_id are required in the request body".into(),
        ));
    };

    web::block(move || {
        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        assignment::assign(&db_thread_pool, &notification_dao, shift_id, user_id)
    })
    .await??;

    Ok(HttpResponse::Ok().json(OutputShiftAssignment {
        message: "User assigned to shift successfully",
        shift_id,
        user_id: Some(user_id),
    }))
}

pub async fn unassign(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    body: web::Json<InputShiftId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let Some(shift_id) = body.shift_id else {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Missing shift_id".into(),
        ));
    };

    web::block(move || {
        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        assignment::unassign(&db_thread_pool, &notification_dao, shift_id)
    })
    .await??;

    Ok(HttpResponse::Ok().json(OutputShiftAssignment {
        message: "Shift unassigned successfully",
        shift_id,
        user_id: None,
    }))
}
