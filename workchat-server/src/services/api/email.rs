use actix_web::web::*;

use crate::handlers::email;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/email")
            .wrap(CorsMiddleware::new("POST, OPTIONS"))
            .service(json_resource("").route(post().to(email::send_template))),
    );
}
