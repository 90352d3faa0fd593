use actix_web::web::*;

use crate::handlers::role;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/roles")
            .wrap(CorsMiddleware::new("GET, POST, PUT, DELETE, OPTIONS"))
            .service(
                json_resource("")
                    .route(get().to(role::list))
                    .route(post().to(role::create)),
            )
            .service(
                json_resource("/{role_id}")
                    .route(get().to(role::get))
                    .route(put().to(role::update))
                    .route(delete().to(role::delete)),
            ),
    );
}
