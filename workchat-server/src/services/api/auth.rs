use actix_web::web::*;

use crate::handlers::auth;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/auth")
            .wrap(CorsMiddleware::new("POST, OPTIONS"))
            .service(json_resource("/login").route(post().to(auth::login)))
            .service(json_resource("/forgot_password").route(post().to(auth::forgot_password)))
            .service(json_resource("/reset_password").route(post().to(auth::reset_password))),
    );
}
