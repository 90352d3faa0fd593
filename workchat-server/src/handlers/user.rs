use workchat_common::db::{self, DaoError, DbThreadPool};
use workchat_common::models::user::{NewUser, UserChanges};
use workchat_common::notifications::{best_effort, NotificationSink, NotificationTemplate};
use workchat_common::request_io::{
    InputPasswordChange, InputUser, InputUserRole, InputUserUpdate, OutputId, OutputMessage,
    OutputUserWithDepartments, ShiftQuery,
};

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::handlers::{self, error::HttpErrorResponse, password, shift};
use crate::middleware::auth::Authenticated;

const MIN_PASSWORD_LENGTH: usize = 8;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_data: web::Json<InputUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let email = user_data.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "A valid email address is required".into(),
        ));
    }

    if user_data.first_name.trim().is_empty() || user_data.last_name.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "First and last name are required".into(),
        ));
    }

    if user_data.password.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Password is required".into(),
        ));
    }

    let password_hash = password::hash(&user_data.password).await?;

    let first_name = user_data.first_name.trim().to_string();
    let last_name = user_data.last_name.trim().to_string();
    let phone_number = user_data.phone_number.clone();
    let is_manager = user_data.is_manager;

    let user_id = match web::block(move || {
        let new_user = NewUser {
            email: &email,
            first_name: &first_name,
            last_name: &last_name,
            phone_number: phone_number.as_deref(),
            password_hash: &password_hash,
            is_manager,
            created_timestamp: Utc::now(),
        };

        db::user::Dao::new(&db_thread_pool).create_user(&new_user)
    })
    .await?
    {
        Ok(id) => id,
        Err(e) if e.is_unique_violation() => {
            return Err(HttpErrorResponse::ConflictWithExisting(
                "A user with this email already exists".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to create user".into(),
            ));
        }
    };

    Ok(HttpResponse::Created().json(OutputId { id: user_id }))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
    user_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_id.into_inner();

    let user = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        let user = user_dao.get_user(user_id)?;
        let departments = user_dao.get_user_departments(user_id)?;

        Ok::<_, db::DaoError>(OutputUserWithDepartments { user, departments })
    })
    .await?
    {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist("User not found".into()));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get user".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(user))
}

pub async fn list(
    db_thread_pool: web::Data<DbThreadPool>,
    _token: Authenticated,
) -> Result<HttpResponse, HttpErrorResponse> {
    let users = match web::block(move || db::user::Dao::new(&db_thread_pool).list_users()).await? {
        Ok(u) => u,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get users".into(),
            ));
        }
    };

    Ok(HttpResponse::Ok().json(users))
}

pub async fn update(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
    user_data: web::Json<InputUserUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_id.into_inner();
    handlers::require_self_or_manager(
        &token.claims,
        user_id,
        "Not authorized to update this user",
    )?;

    let user_data = user_data.into_inner();

    if !token.claims.is_manager && (user_data.is_manager.is_some() || user_data.role_id.is_some())
    {
        return Err(HttpErrorResponse::UserDisallowed(
            "Only managers can change roles or manager status".into(),
        ));
    }

    let email = user_data.email.as_deref().map(|e| e.trim().to_lowercase());
    if let Some(email) = &email {
        if email.is_empty() || !email.contains('@') {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                "A valid email address is required".into(),
            ));
        }
    }

    let first_name = user_data.first_name.as_deref().map(str::trim);
    let last_name = user_data.last_name.as_deref().map(str::trim);
    if first_name == Some("") || last_name == Some("") {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "First and last name cannot be empty".into(),
        ));
    }

    let changes = UserChanges {
        email: email.as_deref(),
        first_name,
        last_name,
        phone_number: user_data.phone_number.as_ref().map(|p| p.as_deref()),
        is_manager: user_data.is_manager,
        role_id: user_data.role_id,
    };

    if changes.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "No fields to update".into(),
        ));
    }

    let first_name = first_name.map(String::from);
    let last_name = last_name.map(String::from);

    let updated = match web::block(move || {
        let changes = UserChanges {
            email: email.as_deref(),
            first_name: first_name.as_deref(),
            last_name: last_name.as_deref(),
            phone_number: user_data.phone_number.as_ref().map(|p| p.as_deref()),
            is_manager: user_data.is_manager,
            role_id: user_data.role_id,
        };

        db::user::Dao::new(&db_thread_pool).update_user(user_id, &changes)
    })
    .await?
    {
        Ok(count) => count,
        Err(e) if e.is_unique_violation() => {
            return Err(HttpErrorResponse::ConflictWithExisting(
                "A user with this email already exists".into(),
            ));
        }
        Err(e) if e.is_foreign_key_violation() => {
            return Err(HttpErrorResponse::DoesNotExist("Role not found".into()));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update user".into(),
            ));
        }
    };

    if updated == 0 {
        return Err(HttpErrorResponse::DoesNotExist("User not found".into()));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "User updated successfully",
    }))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let user_id = user_id.into_inner();

    let deleted =
        match web::block(move || db::user::Dao::new(&db_thread_pool).delete_user(user_id)).await? {
            Ok(count) => count,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(
                    "Failed to delete user".into(),
                ));
            }
        };

    if deleted == 0 {
        return Err(HttpErrorResponse::DoesNotExist("User not found".into()));
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "User deleted successfully",
    }))
}

enum RoleAssignmentError {
    RoleNotFound,
    UserNotFound,
    Dao(DaoError),
}

impl From<DaoError> for RoleAssignmentError {
    fn from(e: DaoError) -> Self {
        RoleAssignmentError::Dao(e)
    }
}

pub async fn update_role(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
    role_data: web::Json<InputUserRole>,
) -> Result<HttpResponse, HttpErrorResponse> {
    handlers::require_manager(&token.claims)?;

    let user_id = user_id.into_inner();
    let role_name = match role_data.role_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => String::from(name),
        _ => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                "Role name is required".into(),
            ));
        }
    };

    let result = web::block(move || {
        let role = match db::role::Dao::new(&db_thread_pool).get_role_by_name(&role_name) {
            Err(e) if e.is_not_found() => return Err(RoleAssignmentError::RoleNotFound),
            r => r?,
        };

        let user = match db::user::Dao::new(&db_thread_pool).set_role(user_id, role.id) {
            Err(e) if e.is_not_found() => return Err(RoleAssignmentError::UserNotFound),
            r => r?,
        };

        best_effort(
            "notify user of role change",
            db::notification::Dao::new(&db_thread_pool).notify_user(
                user.id,
                &NotificationTemplate::RoleUpdated {
                    role_name: &role.name,
                }
                .render(),
            ),
        );

        Ok(user)
    })
    .await?;

    match result {
        Ok(user) => Ok(HttpResponse::Ok().json(user)),
        Err(RoleAssignmentError::RoleNotFound) => {
            Err(HttpErrorResponse::DoesNotExist("Role not found".into()))
        }
        Err(RoleAssignmentError::UserNotFound) => {
            Err(HttpErrorResponse::DoesNotExist("User not found".into()))
        }
        Err(RoleAssignmentError::Dao(e)) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to update user role".into(),
            ))
        }
    }
}

pub async fn change_password(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
    password_data: web::Json<InputPasswordChange>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_id.into_inner();

    if token.claims.user_id != user_id {
        return Err(HttpErrorResponse::UserDisallowed(
            "Not authorized to update this user's password".into(),
        ));
    }

    let (current_password, new_password) = match (
        password_data.current_password.as_deref(),
        password_data.new_password.as_deref(),
    ) {
        (Some(current), Some(new)) if !current.is_empty() && !new.is_empty() => (current, new),
        _ => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                "Current password and new password are required".into(),
            ));
        }
    };

    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "New password must be at least 8 characters long".into(),
        ));
    }

    let db_thread_pool_ref = db_thread_pool.clone();
    let user = match web::block(move || db::user::Dao::new(&db_thread_pool_ref).get_user(user_id))
        .await?
    {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist("User not found".into()));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update password".into(),
            ));
        }
    };

    if !password::verify(current_password, user.password_hash).await? {
        return Err(HttpErrorResponse::IncorrectCredential(
            "Current password is incorrect".into(),
        ));
    }

    let password_hash = password::hash(new_password).await?;

    match web::block(move || {
        db::user::Dao::new(&db_thread_pool).update_password_hash(user_id, &password_hash)
    })
    .await?
    {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update password".into(),
            ));
        }
    }

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Password updated successfully",
    }))
}

/// The shifts a user holds, paginated and filtered like the shift listing.
pub async fn shifts(
    db_thread_pool: web::Data<DbThreadPool>,
    token: Authenticated,
    user_id: web::Path<i32>,
    query: web::Query<ShiftQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_id.into_inner();
    handlers::require_self_or_manager(
        &token.claims,
        user_id,
        "Not authorized to view this user's shifts",
    )?;

    let db_thread_pool_ref = db_thread_pool.clone();
    match web::block(move || db::user::Dao::new(&db_thread_pool_ref).get_user(user_id)).await? {
        Ok(_) => (),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist("User not found".into()));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to get shifts".into(),
            ));
        }
    }

    let query = ShiftQuery {
        user_id: Some(user_id),
        ..query.into_inner()
    };

    shift::shift_page(db_thread_pool, query).await
}
