use actix_web::web::*;

use crate::handlers::{availability, user};
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/users")
            .wrap(CorsMiddleware::new("GET, POST, PUT, DELETE, OPTIONS"))
            .service(
                json_resource("")
                    .route(get().to(user::list))
                    .route(post().to(user::create)),
            )
            .service(json_resource("/{user_id}/role").route(put().to(user::update_role)))
            .service(json_resource("/{user_id}/password").route(put().to(user::change_password)))
            .service(json_resource("/{user_id}/shifts").route(get().to(user::shifts)))
            .service(
                json_resource("/{user_id}/availability")
                    .route(get().to(availability::get))
                    .route(post().to(availability::create))
                    .route(put().to(availability::replace))
                    .route(delete().to(availability::delete)),
            )
            .service(
                json_resource("/{user_id}")
                    .route(get().to(user::get))
                    .route(put().to(user::update))
                    .route(delete().to(user::delete)),
            ),
    );
}
