use workchat_common::db::{self, DbThreadPool};
use workchat_common::email::templates::EmailTemplate;
use workchat_common::email::{EmailBody, EmailSender, OutgoingEmail};
use workchat_common::notifications::{best_effort, NotificationSink, NotificationTemplate};
use workchat_common::request_io::{InputTemplateEmail, OutputEmailSent};

use actix_web::{web, HttpResponse};
use std::str::FromStr;

use crate::env;
use crate::handlers::{self, error::HttpErrorResponse};
use crate::middleware::auth::Authenticated;

pub async fn send_template(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<EmailSender>,
    token: Authenticated,
    request: web::Json<InputTemplateEmail>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let request = request.into_inner();

    let template = EmailTemplate::from_str(&request.template_type)
        .map_err(|e| HttpErrorResponse::IncorrectlyFormed(e.to_string().into()))?;
    let body = template
        .render(&request.template_data, &env::CONF.app_url)
        .map_err(|e| HttpErrorResponse::IncorrectlyFormed(e.to_string().into()))?;

    let recipient_id = request.recipient_id;
    let db_thread_pool_ref = db_thread_pool.clone();

    let recipient = match web::block(move || {
        db::user::Dao::new(&db_thread_pool_ref).get_user(recipient_id)
    })
    .await?
    {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Recipient not found".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get recipient".into(),
            ));
        }
    };

    let message = match OutgoingEmail::new(
        &recipient.email,
        template.subject(),
        EmailBody::Text(body),
    ) {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to send email".into(),
            ));
        }
    };

    if let Err(e) = smtp_thread_pool.send(message).await {
        log::error!("{e}");
        return Err(HttpErrorResponse::InternalError(
            "Failed to send email".into(),
        ));
    }

    let subject = template.subject();
    web::block(move || {
        best_effort(
            "record sent email notification",
            db::notification::Dao::new(&db_thread_pool).notify_user(
                recipient_id,
                &NotificationTemplate::EmailSent { subject }.render(),
            ),
        );
    })
    .await?;

    Ok(HttpResponse::Ok().json(OutputEmailSent {
        message: "Email sent successfully",
        template_type: &request.template_type,
        recipient_id,
    }))
}
