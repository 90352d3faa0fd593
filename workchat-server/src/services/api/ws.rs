use actix_web::web::*;

use crate::relay::ws;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/ws", get().to(ws::connect));
}
