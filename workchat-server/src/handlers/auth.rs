use workchat_common::db::{self, DbThreadPool};
use workchat_common::email::{EmailSender, OutgoingEmail};
use workchat_common::request_io::{
    InputCredentials, InputEmail, InputPasswordReset, OutputLogin, OutputMessage,
};
use workchat_common::threadrand::SecureRng;
use workchat_common::token::auth_token::{AuthToken, NewAuthTokenClaims};

use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64_urlsafe;
use base64::Engine;
use ed25519_dalek as ed25519;
use sha2::{Digest, Sha256};
use std::time::SystemTime;

use crate::env;
use crate::handlers::{error::HttpErrorResponse, password};

const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists with this email, you will receive reset instructions.";

pub async fn login(
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<InputCredentials>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let email = credentials.email.trim().to_lowercase();

    let user = match web::block(move || {
        db::user::Dao::new(&db_thread_pool).get_user_by_email(&email)
    })
    .await?
    {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::IncorrectCredential(
                "Invalid credentials".into(),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to look up user".into(),
            ));
        }
    };

    if !password::verify(&credentials.password, user.password_hash.clone()).await? {
        return Err(HttpErrorResponse::IncorrectCredential(
            "Invalid credentials".into(),
        ));
    }

    let token = sign_access_token(user.id, &user.email, user.is_manager)?;

    Ok(HttpResponse::Ok().json(OutputLogin { token, user }))
}

pub async fn forgot_password(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<EmailSender>,
    email: web::Json<InputEmail>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let email = email.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Email is required".into(),
        ));
    }

    let generic_response = HttpResponse::Ok().json(OutputMessage {
        message: RESET_REQUESTED_MESSAGE,
    });

    let db_thread_pool_ref = db_thread_pool.clone();
    let user = match web::block(move || {
        db::user::Dao::new(&db_thread_pool_ref).get_user_by_email(&email)
    })
    .await?
    {
        Ok(u) => u,
        Err(e) if e.is_not_found() => return Ok(generic_response),
        Err(e) => {
            log::error!("{e}");
            return Ok(generic_response);
        }
    };

    let token = b64_urlsafe.encode(SecureRng::next_bytes::<32>());
    let token_hash = Sha256::digest(token.as_bytes());
    let expiration = SystemTime::now() + env::CONF.password_reset_lifetime;
    let user_id = user.id;

    if let Err(e) = web::block(move || {
        db::auth::Dao::new(&db_thread_pool).save_password_reset(&token_hash, user_id, expiration)
    })
    .await?
    {
        log::error!("{e}");
        return Ok(generic_response);
    }

    let message = match OutgoingEmail::password_reset(
        &user.email,
        &env::CONF.app_url,
        &token,
        env::CONF.password_reset_lifetime,
    ) {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Ok(generic_response);
        }
    };

    if let Err(e) = smtp_thread_pool.send(message).await {
        log::error!("{e}");
    }

    Ok(generic_response)
}

pub async fn reset_password(
    db_thread_pool: web::Data<DbThreadPool>,
    reset: web::Json<InputPasswordReset>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if reset.new_password.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "New password is required".into(),
        ));
    }

    let token_hash = Sha256::digest(reset.token.as_bytes());
    let new_password_hash = password::hash(&reset.new_password).await?;

    match web::block(move || {
        db::auth::Dao::new(&db_thread_pool).reset_password(&token_hash, &new_password_hash)
    })
    .await?
    {
        Ok(Some(_)) => Ok(HttpResponse::Ok().json(OutputMessage {
            message: "Password has been reset successfully",
        })),
        Ok(None) => Err(HttpErrorResponse::IncorrectlyFormed(
            "Invalid or expired reset token".into(),
        )),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(
                "Failed to reset password".into(),
            ))
        }
    }
}

fn sign_access_token(
    user_id: i32,
    email: &str,
    is_manager: bool,
) -> Result<String, HttpErrorResponse> {
    let signing_key = ed25519::SigningKey::from_bytes(&env::CONF.token_signing_key);

    NewAuthTokenClaims::expiring_in(user_id, email, is_manager, env::CONF.access_token_lifetime)
        .and_then(|claims| AuthToken::sign_new(claims, &signing_key))
        .map_err(|e| {
            log::error!("Failed to sign access token: {e}");
            HttpErrorResponse::InternalError("Failed to generate access token".into())
        })
}
