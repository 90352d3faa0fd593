use workchat_common::db::{self, DaoError, DbThreadPool};
use workchat_common::models::department::DepartmentChanges;
use workchat_common::notifications::{best_effort, NotificationSink, NotificationTemplate};
use workchat_common::request_io::{
    InputDepartment, InputDepartmentMember, InputDepartmentUpdate, OutputDepartmentWithMembers,
    OutputId, OutputMessage, ShiftQuery,
};

use actix_web::{web, HttpResponse};

use crate::handlers::{self, error::HttpErrorResponse, shift};
use crate::middleware::auth::Authenticated;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    department: web::Json<InputDepartment>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let department = department.into_inner();
    let name = department.name.trim().to_string();

    if name.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Department name is required".into(),
        ));
    }

    let department_id = match web::block(move || {
        db::department::Dao::new(&db_thread_pool)
            .create_department(&name, department.description.as_deref())
    })
    .await?
    {
        Ok(id) => id,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to create department".into(),
            ));
        }
    };

    Ok(HttpResponse::Created().json(OutputId { id: department_id }))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
    department_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let department_id = department_id.into_inner();

    let department = match web::block(move || {
        let department_dao = db::department::Dao::new(&db_thread_pool);
        let department = department_dao.get_department(department_id)?;
        let members = department_dao.get_members(department_id)?;

        Ok::<_, DaoError>(OutputDepartmentWithMembers {
            department,
            members,
        })
    })
    .await?
    {
        Ok(d) => d,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Department not found".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get department".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(department))
}

pub async fn list(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let departments = match web::block(move || {
        db::department::Dao::new(&db_thread_pool).list_departments()
    })
    .await?
    {
        Ok(d) => d,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get departments".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(departments))
}

pub async fn update(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    department_id: web::Path<i32>,
    department: web::Json<InputDepartmentUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let department_id = department_id.into_inner();
    let InputDepartmentUpdate { name, description } = department.into_inner();
    let name = name.map(|n| n.trim().to_string());

    if name.as_deref() == Some("") {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Department name cannot be empty".into(),
        ));
    }

    if name.is_none() && description.is_none() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "No fields to update".into(),
        ));
    }

    let updated = match web::block(move || {
        let changes = DepartmentChanges {
            name: name.as_deref(),
            description: description.as_ref().map(|d| d.as_deref()),
        };

        db::department::Dao::new(&db_thread_pool).update_department(department_id, &changes)
    })
    .await?
    {
        Ok(count) => count,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update department".into(),
            ));
        }
    };

    if updated == 0 {
        return Err(HttpErrorResponse::DoesNotExist(
            "Department not found".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Department updated successfully",
    }))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    department_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let department_id = department_id.into_inner();

    let deleted = match web::block(move || {
        db::department::Dao::new(&db_thread_pool).delete_department(department_id)
    })
    .await?
    {
        Ok(count) => count,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to delete department".into(),
            ));
        }
    };

    if deleted == 0 {
        return Err(HttpErrorResponse::DoesNotExist(
            "Department not found".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Department deleted successfully",
    }))
}

/// Every shift in the department. Visible to its members and to managers.
pub async fn shifts(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    department_id: web::Path<i32>,
    query: web::Query<ShiftQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let department_id = department_id.into_inner();
    let user_id = token.claims.user_id;
    let is_manager = token.claims.is_manager;

    let db_thread_pool_ref = db_thread_pool.clone();
    let may_view = match web::block(move || {
        let department_dao = db::department::Dao::new(&db_thread_pool_ref);
        department_dao.get_department(department_id)?;

        Ok::<_, DaoError>(is_manager || department_dao.is_member(user_id, department_id)?)
    })
    .await?
    {
        Ok(m) => m,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                "Department not found".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get shifts".into(),
            ));
        }
    };

    if !may_view {
        return Err(HttpErrorResponse::UserDisallowed(
            "User not authorized for this department".into(),
        ));
    }

    let query = ShiftQuery {
        department_id: Some(department_id),
        ..query.into_inner()
    };

    shift::shift_page(db_thread_pool, query).await
}

enum MembershipError {
    UserNotFound,
    DepartmentNotFound,
    Dao(DaoError),
}

impl From<DaoError> for MembershipError {
    fn from(e: DaoError) -> Self {
        MembershipError::Dao(e)
    }
}

pub async fn add_member(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    membership: web::Json<InputDepartmentMember>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let InputDepartmentMember {
        user_id,
        department_id,
    } = membership.into_inner();

    let result = web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        let department_dao = db::department::Dao::new(&db_thread_pool);

        match user_dao.get_user(user_id) {
            Err(e) if e.is_not_found() => return Err(MembershipError::UserNotFound),
            r => r?,
        };

        let department = match department_dao.get_department(department_id) {
            Err(e) if e.is_not_found() => return Err(MembershipError::DepartmentNotFound),
            r => r?,
        };

        department_dao.add_member(user_id, department_id)?;

        let notification_dao = db::notification::Dao::new(&db_thread_pool);
        best_effort(
            "notify user of department assignment",
            notification_dao.notify_user(
                user_id,
                &NotificationTemplate::AddedToDepartment {
                    department_name: &department.name,
                }
                .render(),
            ),
        );

        Ok(())
    })
    .await?;

    match result {
        Ok(()) => Ok(HttpResponse::Created().json(OutputMessage {
            message: "User assigned to department successfully",
        })),
        Err(MembershipError::UserNotFound) => {
            Err(HttpErrorResponse::DoesNotExist("User not found".into()))
        }
        Err(MembershipError::DepartmentNotFound) => Err(HttpErrorResponse::DoesNotExist(
            "Department not found".into(),
        )),
        Err(MembershipError::Dao(e)) if e.is_unique_violation() => {
            Err(HttpErrorResponse::ConflictWithExisting(
                "User is already assigned to this department".into(),
            ))
        }
        Err(MembershipError::Dao(e)) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to assign user to department".into(),
            ))
        }
    }
}

pub async fn remove_member(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let (department_id, user_id) = path.into_inner();

    let removed = match web::block(move || {
        let department_dao = db::department::Dao::new(&db_thread_pool);

        if department_dao.remove_member(user_id, department_id)? == 0 {
            return Ok(false);
        }

        let department_name =
            best_effort("load department name", department_dao.get_department(department_id))
                .map(|d| d.name)
                .unwrap_or_default();

        best_effort(
            "notify user of department removal",
            db::notification::Dao::new(&db_thread_pool).notify_user(
                user_id,
                &NotificationTemplate::RemovedFromDepartment {
                    department_name: &department_name,
                }
                .render(),
            ),
        );

        Ok::<_, DaoError>(true)
    })
    .await?
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to remove user from department".into(),
            ));
        }
    };

    if !removed {
        return Err(HttpErrorResponse::DoesNotExist(
            "Assignment not found".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "User removed from department successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::{header, Method, StatusCode};
    use actix_web::test::{self, TestRequest};
    use serde_json::{json, Value};

    use crate::env;
    use crate::handlers::test_utils::{self, bearer};

    fn notifications_for(user_id: i32) -> Vec<String> {
        db::notification::Dao::new(&env::testing::DB_THREAD_POOL)
            .get_notifications(user_id, 50, 0, false)
            .unwrap()
            .0
            .into_iter()
            .map(|n| n.content)
            .collect()
    }

    #[actix_web::test]
    async fn test_create_and_get_department() {
        let app = test_utils::init_app().await;
        let (manager, manager_token) = test_utils::create_user(true);
        let (_, employee_token) = test_utils::create_user(false);

        let req = TestRequest::post()
            .uri("/api/departments")
            .insert_header(bearer(&employee_token))
            .set_json(json!({ "name": "Kitchen" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::post()
            .uri("/api/departments")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": "  ", "description": "blank" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/api/departments")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": "Kitchen", "description": "Back of house" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        let department_id = body["id"].as_i64().unwrap() as i32;
        test_utils::add_member(manager.id, department_id);

        let req = TestRequest::get()
            .uri(&format!("/api/departments/{department_id}"))
            .insert_header(bearer(&employee_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["name"], "Kitchen");
        assert_eq!(body["description"], "Back of house");
        assert_eq!(body["members"].as_array().unwrap().len(), 1);
        assert_eq!(body["members"][0]["id"], manager.id);
        assert_eq!(body["members"][0]["is_manager"], true);

        let req = TestRequest::get()
            .uri("/api/departments/-1")
            .insert_header(bearer(&employee_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_add_and_remove_member() {
        let app = test_utils::init_app().await;
        let (_, manager_token) = test_utils::create_user(true);
        let (employee, _) = test_utils::create_user(false);
        let department_id = test_utils::create_department();

        let add = |user_id: i32, department_id: i32| {
            TestRequest::post()
                .uri("/api/departments/members")
                .insert_header(bearer(&manager_token))
                .set_json(json!({ "user_id": user_id, "department_id": department_id }))
                .to_request()
        };

        let resp = test::call_service(&app, add(employee.id, department_id)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let department_name = db::department::Dao::new(&env::testing::DB_THREAD_POOL)
            .get_department(department_id)
            .unwrap()
            .name;
        assert_eq!(
            notifications_for(employee.id),
            vec![format!(
                "You have been added to the {department_name} department"
            )]
        );

        let resp = test::call_service(&app, add(employee.id, department_id)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User is already assigned to this department");

        let resp = test::call_service(&app, add(-1, department_id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User not found");

        let resp = test::call_service(&app, add(employee.id, -1)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Department not found");

        let remove_uri = format!("/api/departments/{department_id}/members/{}", employee.id);

        let req = TestRequest::delete()
            .uri(&remove_uri)
            .insert_header(bearer(&manager_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert!(!db::department::Dao::new(&env::testing::DB_THREAD_POOL)
            .is_member(employee.id, department_id)
            .unwrap());
        assert!(notifications_for(employee.id).contains(&format!(
            "You have been removed from the {department_name} department"
        )));

        let req = TestRequest::delete()
            .uri(&remove_uri)
            .insert_header(bearer(&manager_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Assignment not found");
    }

    #[actix_web::test]
    async fn test_preflight_and_unsupported_method() {
        let app = test_utils::init_app().await;

        let req = TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/departments")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .and_then(|v| v.to_str().ok()),
            Some("GET, POST, PUT, DELETE, OPTIONS")
        );

        let req = TestRequest::patch().uri("/api/departments").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[actix_web::test]
    async fn test_list_departments() {
        let app = test_utils::init_app().await;
        let (manager, _) = test_utils::create_user(true);
        let (employee, employee_token) = test_utils::create_user(false);
        let department_id = test_utils::create_department();
        test_utils::add_member(manager.id, department_id);
        test_utils::add_member(employee.id, department_id);
        test_utils::create_shift(department_id, manager.id, Some(employee.id), 5);

        let req = TestRequest::get()
            .uri("/api/departments")
            .insert_header(bearer(&employee_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let listed = body
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["id"] == department_id)
            .unwrap();
        assert_eq!(listed["member_count"], 2);
        assert_eq!(listed["shift_count"], 1);
        assert_eq!(listed["managers"].as_array().unwrap().len(), 1);
        assert_eq!(listed["managers"][0]["id"], manager.id);
    }

    #[actix_web::test]
    async fn test_update_and_delete_department() {
        let app = test_utils::init_app().await;
        let (_, manager_token) = test_utils::create_user(true);
        let (_, employee_token) = test_utils::create_user(false);
        let department_id = test_utils::create_department();
        let uri = format!("/api/departments/{department_id}");

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&employee_token))
            .set_json(json!({ "name": "Bakery" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        for (payload, message) in [
            (json!({}), "No fields to update"),
            (json!({ "name": " " }), "Department name cannot be empty"),
        ] {
            let req = TestRequest::put()
                .uri(&uri)
                .insert_header(bearer(&manager_token))
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], message);
        }

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": "Bakery", "description": "Bread and pastry" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Department updated successfully");

        let department_dao = db::department::Dao::new(&env::testing::DB_THREAD_POOL);
        let department = department_dao.get_department(department_id).unwrap();
        assert_eq!(department.name, "Bakery");
        assert_eq!(department.description.as_deref(), Some("Bread and pastry"));

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "description": null }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let department = department_dao.get_department(department_id).unwrap();
        assert_eq!(department.name, "Bakery");
        assert_eq!(department.description, None);

        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&employee_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer(&manager_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Department deleted successfully");
        assert!(department_dao
            .get_department(department_id)
            .unwrap_err()
            .is_not_found());

        for req in [
            TestRequest::delete()
                .uri(&uri)
                .insert_header(bearer(&manager_token))
                .to_request(),
            TestRequest::put()
                .uri(&uri)
                .insert_header(bearer(&manager_token))
                .set_json(json!({ "name": "Gone" }))
                .to_request(),
        ] {
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Department not found");
        }
    }

    #[actix_web::test]
    async fn test_department_shifts() {
        let app = test_utils::init_app().await;
        let (manager, manager_token) = test_utils::create_user(true);
        let (member, member_token) = test_utils::create_user(false);
        let (_, outsider_token) = test_utils::create_user(false);
        let department_id = test_utils::create_department();
        let other_department_id = test_utils::create_department();
        test_utils::add_member(member.id, department_id);

        let held = test_utils::create_shift(department_id, manager.id, Some(member.id), 3);
        let open = test_utils::create_shift(department_id, manager.id, None, 4);
        test_utils::create_shift(other_department_id, manager.id, None, 5);

        let uri = format!("/api/departments/{department_id}/shifts");

        for token in [&member_token, &manager_token] {
            let req = TestRequest::get()
                .uri(&format!("{uri}?department_id={other_department_id}"))
                .insert_header(bearer(token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);

            let body: Value = test::read_body_json(resp).await;
            let ids: Vec<i64> = body["shifts"]
                .as_array()
                .unwrap()
                .iter()
                .map(|s| s["id"].as_i64().unwrap())
                .collect();
            assert_eq!(ids, vec![i64::from(held), i64::from(open)]);
            assert_eq!(body["pagination"]["total"], 2);
        }

        let req = TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&outsider_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::get()
            .uri("/api/departments/-1/shifts")
            .insert_header(bearer(&manager_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
