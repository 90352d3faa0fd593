use workchat_common::db::{self, DbThreadPool};
use workchat_common::models::availability::{self, AvailabilityError, NewAvailability};
use workchat_common::request_io::{InputAvailabilityWeek, OutputAvailabilities, OutputMessage};

use actix_web::{web, HttpResponse};

use crate::handlers::{self, error::HttpErrorResponse};
use crate::middleware::auth::Authenticated;

const NOT_YOURS: &str = "Not authorized to change this user's availability";

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
    user_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_id.into_inner();

    let availabilities = match web::block(move || {
        db::user::Dao::new(&db_thread_pool).get_user(user_id)?;
        db::availability::Dao::new(&db_thread_pool).get_week(user_id)
    })
    .await?
    {
        Ok(a) => a,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist("User not found".into()));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get availability".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(OutputAvailabilities { availabilities }))
}

/// Stores a first week of availability. Same as `replace`, but answers 201.
pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
    week: web::Json<InputAvailabilityWeek>,
) -> Result<HttpResponse, HttpErrorResponse> {
    store_week(db_thread_pool, token, user_id.into_inner(), week.into_inner()).await?;

    Ok(HttpResponse::Created().json(OutputMessage {
        message: "Availability updated successfully",
    }))
}

pub async fn replace(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
    week: web::Json<InputAvailabilityWeek>,
) -> Result<HttpResponse, HttpErrorResponse> {
    store_week(db_thread_pool, token, user_id.into_inner(), week.into_inner()).await?;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Availability updated successfully",
    }))
}

async fn store_week(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: i32,
    week: InputAvailabilityWeek,
) -> Result<(), HttpErrorResponse> {
    handlers::require_self_or_manager(&token.claims, user_id, NOT_YOURS)?;

    let Some(days) = week.availabilities else {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Missing availabilities array".into(),
        ));
    };

    let parsed = days
        .iter()
        .map(|d| {
            NewAvailability::parse(
                user_id,
                d.day,
                d.is_available,
                &d.start_time,
                &d.end_time,
            )
        })
        .collect::<Result<Vec<_>, AvailabilityError>>()
        .and_then(|parsed| availability::check_full_week(&parsed).map(|_| parsed));

    let parsed = match parsed {
        Ok(p) => p,
        Err(e) => return Err(HttpErrorResponse::IncorrectlyFormed(e.to_string().into())),
    };

    match web::block(move || {
        db::availability::Dao::new(&db_thread_pool).replace_week(user_id, &parsed)
    })
    .await?
    {
        Ok(()) => Ok(()),
        Err(e) if e.is_foreign_key_violation() => {
            Err(HttpErrorResponse::DoesNotExist("User not found".into()))
        }
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to update availability".into(),
            ))
        }
    }
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_id.into_inner();
    handlers::require_self_or_manager(&token.claims, user_id, NOT_YOURS)?;

    let cleared = match web::block(move || {
        db::availability::Dao::new(&db_thread_pool).clear_week(user_id)
    })
    .await?
    {
        Ok(count) => count,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to delete availability".into(),
            ));
        }
    };

    if cleared == 0 {
        return Err(HttpErrorResponse::DoesNotExist(
            "No availability records found".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Availability deleted successfully",
    }))
}
