use actix_web::web::*;

use crate::handlers::time_off;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/time_off")
            .wrap(CorsMiddleware::new("GET, POST, PUT, OPTIONS"))
            .service(
                json_resource("")
                    .route(get().to(time_off::get))
                    .route(post().to(time_off::create)),
            )
            .service(json_resource("/{request_id}/status").route(put().to(time_off::set_status))),
    );
}
