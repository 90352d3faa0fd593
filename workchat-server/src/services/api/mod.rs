use actix_web::web::*;

use crate::handlers::{self, error::HttpErrorResponse};

mod auth;
mod department;
mod email;
mod health;
mod message;
mod notification;
mod role;
mod shift;
mod time_off;
mod user;
mod ws;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        HttpErrorResponse::IncorrectlyFormed(format!("Invalid request body: {err}").into()).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        HttpErrorResponse::IncorrectlyFormed(format!("Invalid query: {err}").into()).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        HttpErrorResponse::IncorrectlyFormed(format!("Invalid path: {err}").into()).into()
    }))
    .service(
        scope("/api")
            .configure(auth::configure)
            .configure(department::configure)
            .configure(email::configure)
            .configure(message::configure)
            .configure(notification::configure)
            .configure(role::configure)
            .configure(shift::configure)
            .configure(time_off::configure)
            .configure(user::configure)
            .configure(ws::configure)
            .configure(health::configure),
    );
}

/// A resource that answers methods it has no route for with 405.
fn json_resource(path: &str) -> Resource {
    resource(path).default_service(to(handlers::method_not_allowed))
}
