use actix_web::web::*;

use crate::handlers::message;
use crate::middleware::cors::CorsMiddleware;

use super::json_resource;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/messages")
            .wrap(CorsMiddleware::new("GET, POST, PUT, DELETE, OPTIONS"))
            .service(json_resource("").route(post().to(message::send)))
            .service(json_resource("/conversations").route(get().to(message::get_conversations)))
            .service(
                json_resource("/conversation/{user_id}").route(get().to(message::get_conversation)),
            )
            .service(
                json_resource("/{message_id}")
                    .route(put().to(message::edit))
                    .route(delete().to(message::delete)),
            ),
    );
}
