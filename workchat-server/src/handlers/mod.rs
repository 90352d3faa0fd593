pub mod auth;
pub mod availability;
pub mod department;
pub mod email;
pub mod exchange;
pub mod health;
pub mod message;
pub mod notification;
pub mod role;
pub mod shift;
pub mod time_off;
pub mod user;

use actix_web::HttpResponse;

use crate::handlers::error::HttpErrorResponse;

pub const CORS_ALLOWED_HEADERS_VALUE: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

pub async fn method_not_allowed() -> Result<HttpResponse, HttpErrorResponse> {
    Err(HttpErrorResponse::MethodNotAllowed("Method not allowed".into()))
}

pub fn require_manager(
    claims: &workchat_common::token::auth_token::AuthTokenClaims,
) -> Result<(), HttpErrorResponse> {
    if claims.is_manager {
        Ok(())
    } else {
        Err(HttpErrorResponse::UserDisallowed(
            "Manager access required".into(),
        ))
    }
}

/// Lets a user act on their own record, and managers act on anyone's.
pub fn require_self_or_manager(
    claims: &workchat_common::token::auth_token::AuthTokenClaims,
    user_id: i32,
    message: &'static str,
) -> Result<(), HttpErrorResponse> {
    if claims.is_manager || claims.user_id == user_id {
        Ok(())
    } else {
        Err(HttpErrorResponse::UserDisallowed(message.into()))
    }
}

pub mod password {
    use std::str::FromStr;
    use tokio::sync::oneshot;
    use zeroize::Zeroizing;

    use super::error::HttpErrorResponse;
    use crate::env;

    /// Hashes the password with argon2id on the rayon pool.
    pub async fn hash(password: &str) -> Result<String, HttpErrorResponse> {
        let password = Zeroizing::new(String::from(password));
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let hash_result = argon2_kdf::Hasher::default()
                .algorithm(argon2_kdf::Algorithm::Argon2id)
                .salt_length(env::CONF.hash_salt_length)
                .hash_length(env::CONF.hash_length)
                .iterations(env::CONF.hash_iterations)
                .memory_cost_kib(env::CONF.hash_mem_cost_kib)
                .threads(env::CONF.hash_threads)
                .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
                .hash(password.as_bytes());

            // The receiver only disappears if the request was dropped
            let _ = sender.send(hash_result.map(|h| h.to_string()));
        });

        match receiver.await? {
            Ok(h) => Ok(h),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError(
                    "Failed to hash password".into(),
                ))
            }
        }
    }

    pub async fn verify(password: &str, stored_hash: String) -> Result<bool, HttpErrorResponse> {
        let password = Zeroizing::new(String::from(password));
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let result = argon2_kdf::Hash::from_str(&stored_hash).map(|hash| {
                hash.verify_with_secret(
                    password.as_bytes(),
                    argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
                )
            });

            let _ = sender.send(result);
        });

        match receiver.await? {
            Ok(matches) => Ok(matches),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError(
                    "Failed to validate password".into(),
                ))
            }
        }
    }
}

pub mod error {
    use workchat_common::token::TokenError;
    use workchat_common::workflow::WorkflowError;

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use serde_json::json;
    use std::borrow::Cow;
    use std::fmt;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(Cow<'static, str>),
        InvalidState(Cow<'static, str>),

        // 401
        IncorrectCredential(Cow<'static, str>),
        BadToken(Cow<'static, str>),
        TokenExpired(Cow<'static, str>),
        TokenMissing(Cow<'static, str>),

        // 403
        UserDisallowed(Cow<'static, str>),

        // 404
        DoesNotExist(Cow<'static, str>),

        // 405
        MethodNotAllowed(Cow<'static, str>),

        // 409
        ConflictWithExisting(Cow<'static, str>),

        // 500
        InternalError(Cow<'static, str>),
    }

    impl HttpErrorResponse {
        pub fn message(&self) -> &str {
            match self {
                HttpErrorResponse::IncorrectlyFormed(msg)
                | HttpErrorResponse::InvalidState(msg)
                | HttpErrorResponse::IncorrectCredential(msg)
                | HttpErrorResponse::BadToken(msg)
                | HttpErrorResponse::TokenExpired(msg)
                | HttpErrorResponse::TokenMissing(msg)
                | HttpErrorResponse::UserDisallowed(msg)
                | HttpErrorResponse::DoesNotExist(msg)
                | HttpErrorResponse::MethodNotAllowed(msg)
                | HttpErrorResponse::ConflictWithExisting(msg)
                | HttpErrorResponse::InternalError(msg) => msg,
            }
        }
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message())
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(json!({ "error": self.message() }))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_) | HttpErrorResponse::InvalidState(_) => {
                    StatusCode::BAD_REQUEST
                }
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
                HttpErrorResponse::ConflictWithExisting(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError("Actix thread pool failure".into())
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError("Rayon thread pool failure".into())
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::BadToken("Invalid or expired token".into())
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired("Invalid or expired token".into())
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing("No token provided".into())
                }
            }
        }
    }

    impl From<WorkflowError> for HttpErrorResponse {
        fn from(err: WorkflowError) -> Self {
            match err {
                WorkflowError::NoDepartmentAssigned => HttpErrorResponse::IncorrectlyFormed(
                    "User not assigned to any departments".into(),
                ),
                WorkflowError::ShiftNotFound => {
                    HttpErrorResponse::DoesNotExist("Shift not found".into())
                }
                WorkflowError::InvalidState => HttpErrorResponse::InvalidState(
                    "Shift cannot be relinquished - invalid status".into(),
                ),
                WorkflowError::ShiftNotAvailable { lost_race: false } => {
                    HttpErrorResponse::DoesNotExist("Shift not available for pickup".into())
                }
                WorkflowError::ShiftNotAvailable { lost_race: true } => {
                    HttpErrorResponse::InvalidState("Failed to pick up shift".into())
                }
                WorkflowError::CannotClaimOwnShift => {
                    HttpErrorResponse::InvalidState("Cannot pick up your own shift".into())
                }
                WorkflowError::NotAuthorizedForDepartment => HttpErrorResponse::UserDisallowed(
                    "User not authorized for this department".into(),
                ),
                WorkflowError::ScheduleConflict => {
                    HttpErrorResponse::ConflictWithExisting("Schedule conflict detected".into())
                }
                WorkflowError::UserNotFound => {
                    HttpErrorResponse::DoesNotExist("User not found".into())
                }
                WorkflowError::AlreadyUnassigned => {
                    HttpErrorResponse::InvalidState("Shift is already unassigned".into())
                }
                WorkflowError::ShiftClosed => {
                    HttpErrorResponse::InvalidState("Shift is completed or cancelled".into())
                }
                WorkflowError::Dao(e) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError("Internal server error".into())
                }
            }
        }
    }
}
