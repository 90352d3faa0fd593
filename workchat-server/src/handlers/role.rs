use workchat_common::db::{self, DbThreadPool};
use workchat_common::models::role::RoleChanges;
use workchat_common::request_io::{InputRole, OutputId, OutputMessage};

use actix_web::{web, HttpResponse};

use crate::handlers::{self, error::HttpErrorResponse};
use crate::middleware::auth::Authenticated;

const NAME_TAKEN: &str = "A role with this name already exists";

fn trimmed(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim)
}

pub async fn list(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let roles = match web::block(move || db::role::Dao::new(&db_thread_pool).list_roles()).await? {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get roles".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(roles))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
    role_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let role_id = role_id.into_inner();

    match web::block(move || db::role::Dao::new(&db_thread_pool).get_role(role_id)).await? {
        Ok(role) => Ok(HttpResponse::Ok().json(role)),
        Err(e) if e.is_not_found() => Err(HttpErrorResponse::DoesNotExist("Role not found".into())),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError("Failed to get role".into()))
        }
    }
}

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    role_data: web::Json<InputRole>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let (name, description) = match (trimmed(&role_data.name), trimmed(&role_data.description)) {
        (Some(name), Some(description)) if !name.is_empty() => {
            (String::from(name), String::from(description))
        }
        _ => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                "Missing required fields".into(),
            ));
        }
    };

    match web::block(move || {
        db::role::Dao::new(&db_thread_pool).create_role(&name, &description)
    })
    .await?
    {
        Ok(id) => Ok(HttpResponse::Created().json(OutputId { id })),
        Err(e) if e.is_unique_violation() => {
            Err(HttpErrorResponse::ConflictWithExisting(NAME_TAKEN.into()))
        }
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to create role".into(),
            ))
        }
    }
}

pub async fn update(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    role_id: web::Path<i32>,
    role_data: web::Json<InputRole>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let role_id = role_id.into_inner();
    let role_data = role_data.into_inner();

    if trimmed(&role_data.name) == Some("") {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Role name cannot be empty".into(),
        ));
    }

    let changes_are_empty = RoleChanges {
        name: trimmed(&role_data.name),
        description: trimmed(&role_data.description),
    }
    .is_empty();

    if changes_are_empty {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "No fields to update".into(),
        ));
    }

    let updated = match web::block(move || {
        let changes = RoleChanges {
            name: trimmed(&role_data.name),
            description: trimmed(&role_data.description),
        };

        db::role::Dao::new(&db_thread_pool).update_role(role_id, &changes)
    })
    .await?
    {
        Ok(count) => count,
        Err(e) if e.is_unique_violation() => {
            return Err(HttpErrorResponse::ConflictWithExisting(NAME_TAKEN.into()));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update role".into(),
            ));
        }
    };

    if updated == 0 {
        return Err(HttpErrorResponse::DoesNotExist("Role not found".into()));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Role updated successfully",
    }))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    role_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let role_id = role_id.into_inner();

    let deleted =
        match web::block(move || db::role::Dao::new(&db_thread_pool).delete_role(role_id)).await? {
            Ok(count) => count,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(
                    "Failed to delete role".into(),
                ));
            }
        };

    if deleted == 0 {
        return Err(HttpErrorResponse::DoesNotExist("Role not found".into()));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Role deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use serde_json::{json, Value};
    use workchat_common::threadrand::SecureRng;

    use crate::env;
    use crate::handlers::test_utils::{self, bearer};

    fn unique_role_name() -> String {
        format!("Role {}", SecureRng::next_u128())
    }

    #[actix_web::test]
    async fn test_role_crud() {
        let app = test_utils::init_app().await;
        let (_, manager_token) = test_utils::create_user(true);
        let (_, employee_token) = test_utils::create_user(false);
        let name = unique_role_name();

        let req = TestRequest::post()
            .uri("/api/roles")
            .insert_header(bearer(&employee_token))
            .set_json(json!({ "name": name, "description": "Opens the store" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::post()
            .uri("/api/roles")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Missing required fields");

        let req = TestRequest::post()
            .uri("/api/roles")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": name, "description": "Opens the store" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let role_id = body["id"].as_i64().unwrap() as i32;

        let req = TestRequest::post()
            .uri("/api/roles")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": name, "description": "Again" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = TestRequest::get()
            .uri(&format!("/api/roles/{role_id}"))
            .insert_header(bearer(&employee_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["name"], name.as_str());
        assert_eq!(body["description"], "Opens the store");

        let req = TestRequest::put()
            .uri(&format!("/api/roles/{role_id}"))
            .insert_header(bearer(&manager_token))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No fields to update");

        let req = TestRequest::put()
            .uri(&format!("/api/roles/{role_id}"))
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "description": "Opens and closes the store" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Role updated successfully");

        let role = db::role::Dao::new(&env::testing::DB_THREAD_POOL)
            .get_role(role_id)
            .unwrap();
        assert_eq!(role.name, name);
        assert_eq!(role.description, "Opens and closes the store");

        let req = TestRequest::put()
            .uri("/api/roles/-1")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "description": "Nobody" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::delete()
            .uri(&format!("/api/roles/{role_id}"))
            .insert_header(bearer(&manager_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Role deleted successfully");

        for req in [
            TestRequest::get()
                .uri(&format!("/api/roles/{role_id}"))
                .insert_header(bearer(&manager_token))
                .to_request(),
            TestRequest::delete()
                .uri(&format!("/api/roles/{role_id}"))
                .insert_header(bearer(&manager_token))
                .to_request(),
        ] {
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Role not found");
        }
    }

    #[actix_web::test]
    async fn test_list_roles_with_user_counts() {
        let app = test_utils::init_app().await;
        let (holder, token) = test_utils::create_user(false);

        let role_dao = db::role::Dao::new(&env::testing::DB_THREAD_POOL);
        let role_id = role_dao
            .create_role(&unique_role_name(), "Counts the till")
            .unwrap();
        db::user::Dao::new(&env::testing::DB_THREAD_POOL)
            .set_role(holder.id, role_id)
            .unwrap();

        let req = TestRequest::get()
            .uri("/api/roles")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let listed = body
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["id"] == role_id)
            .unwrap();
        assert_eq!(listed["user_count"], 1);
        assert_eq!(listed["description"], "Counts the till");
    }
}
