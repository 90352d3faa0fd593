use workchat_common::db::DbThreadPool;

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::env;
use crate::relay::ConnectionRegistry;

#[derive(Deserialize)]
pub struct HealthKeyQuery {
    pub key: Option<String>,
}

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    db_thread_pool: web::Data<DbThreadPool>,
    registry: web::Data<ConnectionRegistry>,
    query: web::Query<HealthKeyQuery>,
) -> impl Responder {
    if !is_health_key_correct(query.key.as_deref()) {
        return HttpResponse::Unauthorized().finish();
    }

    let pool_state = db_thread_pool.state();
    let resp_body = json!({
        "db_thread_pool_state": {
            "connections": pool_state.connections,
            "idle_connections": pool_state.idle_connections,
        },
        "live_connections": registry.connection_count(),
    });

    HttpResponse::Ok().json(resp_body)
}

#[inline]
fn is_health_key_correct(key: Option<&str>) -> bool {
    let Some(key) = key else {
        return false;
    };

    let correct_key = env::CONF.health_endpoint_key.as_bytes();
    let key = key.as_bytes();

    if correct_key.len() != key.len() || key.is_empty() {
        return false;
    }

    // Constant-time comparison
    let keys_dont_match = correct_key
        .iter()
        .zip(key)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    keys_dont_match == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};

    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_heartbeat() {
        let app = test_utils::init_app().await;

        let req = TestRequest::get().uri("/api/heartbeat").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health_with_valid_key() {
        let app = test_utils::init_app().await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/health?key={}",
                env::CONF.health_endpoint_key
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json: serde_json::Value = test::read_body_json(resp).await;

        let db_state = resp_json.get("db_thread_pool_state").unwrap();
        assert!(db_state.get("connections").is_some());
        assert!(db_state.get("idle_connections").is_some());
        assert!(resp_json["live_connections"].is_u64());
    }

    #[actix_web::test]
    async fn test_health_with_bad_keys() {
        let app = test_utils::init_app().await;

        let wrong_key = env::CONF
            .health_endpoint_key
            .chars()
            .map(|c| if c == 'x' { 'y' } else { 'x' })
            .collect::<String>();

        for uri in [
            String::from("/api/health"),
            String::from("/api/health?key="),
            String::from("/api/health?key=short"),
            format!("/api/health?key={wrong_key}"),
        ] {
            let req = TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
