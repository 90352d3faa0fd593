use actix_web::web::*;

use crate::handlers::department;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/departments")
            .wrap(CorsMiddleware::new("GET, POST, PUT, DELETE, OPTIONS"))
            .service(
                json_resource("")
                    .route(get().to(department::list))
                    .route(post().to(department::create)),
            )
            .service(json_resource("/members").route(post().to(department::add_member)))
            .service(
                json_resource("/{department_id}/members/{user_id}")
                    .route(delete().to(department::remove_member)),
            )
            .service(json_resource("/{department_id}/shifts").route(get().to(department::shifts)))
            .service(
                json_resource("/{department_id}")
                    .route(get().to(department::get))
                    .route(put().to(department::update))
                    .route(delete().to(department::delete)),
            ),
    );
}
