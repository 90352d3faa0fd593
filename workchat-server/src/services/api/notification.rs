use actix_web::web::*;

use crate::handlers::notification;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/notifications")
            .wrap(CorsMiddleware::new("GET, PUT, OPTIONS"))
            .service(json_resource("").route(get().to(notification::get)))
            .service(json_resource("/read").route(put().to(notification::mark_read))),
    );
}
