use actix_web::web::*;

use crate::handlers::{exchange, shift};
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    // Fixed segments must be registered ahead of `/{shift_id}`
    cfg.service(
        scope("/shifts")
            .wrap(CorsMiddleware::new("GET, POST, PUT, DELETE, OPTIONS"))
            .service(
                json_resource("")
                    .route(get().to(shift::list))
                    .route(post().to(shift::create)),
            )
            .service(json_resource("/next").route(get().to(shift::next)))
            .service(json_resource("/exchange").route(get().to(exchange::list_available)))
            .service(json_resource("/exchange/relinquish").route(post().to(exchange::relinquish)))
            .service(json_resource("/exchange/pickup").route(post().to(exchange::pickup)))
            .service(json_resource("/assign").route(put().to(exchange::assign)))
            .service(json_resource("/unassign").route(put().to(exchange::unassign)))
            .service(
                json_resource("/{shift_id}")
                    .route(get().to(shift::get))
                    .route(delete().to(shift::cancel)),
            ),
    );
}
