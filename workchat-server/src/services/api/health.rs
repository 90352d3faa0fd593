use actix_web::web::*;

use crate::handlers::health;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("")
            .wrap(CorsMiddleware::new("GET, OPTIONS"))
            .service(json_resource("/heartbeat").route(get().to(health::heartbeat)))
            .service(json_resource("/health").route(get().to(health::health))),
    );
}
