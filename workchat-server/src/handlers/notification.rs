use workchat_common::db::{self, DbThreadPool};
use workchat_common::request_io::{
    InputNotificationIds, NotificationQuery, OutputNotificationPage, OutputNotificationsRead,
    Pagination,
};

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::Authenticated;

const DEFAULT_PAGE_LIMIT: i64 = 50;

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let unread_only = query.unread_only.unwrap_or(false);

    if limit < 0 || offset < 0 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "limit and offset must not be negative".into(),
        ));
    }

    let user_id = token.claims.user_id;

    let (notifications, total) = match web::block(move || {
        db::notification::Dao::new(&db_thread_pool).get_notifications(
            user_id,
            limit,
            offset,
            unread_only,
        )
    })
    .await?
    {
        Ok(page) => page,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get notifications".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(OutputNotificationPage {
        notifications,
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: Some(offset + limit < total),
        },
    }))
}

pub async fn mark_read(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    body: Option<web::Json<InputNotificationIds>>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let ids = body.and_then(|b| b.into_inner().notification_ids);
    let user_id = token.claims.user_id;

    let updated_ids = match web::block(move || {
        db::notification::Dao::new(&db_thread_pool).mark_read(user_id, ids.as_deref())
    })
    .await?
    {
        Ok(ids) => ids,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to mark notifications as read".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(OutputNotificationsRead {
        message: "Notifications marked as read",
        updated_ids,
    }))
}
