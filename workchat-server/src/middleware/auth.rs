use workchat_common::token::auth_token::{AuthToken, AuthTokenClaims};
use workchat_common::token::key_cache::VerifyingKeyCache;
use workchat_common::token::{Token, TokenError};

use actix_web::dev::Payload;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use std::marker::PhantomData;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::{FromHeader, TokenLocation};

/// Claims of a bearer token whose signature and expiration have been checked against the
/// key held by the app's `VerifyingKeyCache`.
#[derive(Debug)]
pub struct VerifiedToken<L: TokenLocation> {
    pub claims: AuthTokenClaims,
    _marker: PhantomData<L>,
}

pub type Authenticated = VerifiedToken<FromHeader>;

impl<L> FromRequest for VerifiedToken<L>
where
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        future::ready(verify_request::<L>(req).map(|claims| VerifiedToken {
            claims,
            _marker: PhantomData,
        }))
    }
}

#[inline]
fn verify_request<L: TokenLocation>(req: &HttpRequest) -> Result<AuthTokenClaims, HttpErrorResponse> {
    let token = L::get_from_request(req).ok_or(TokenError::TokenMissing)?;
    let decoded_token = AuthToken::decode(token)?;

    let Some(key_cache) = req.app_data::<Data<VerifyingKeyCache>>() else {
        log::error!("No verifying key cache is registered with the app");
        return Err(HttpErrorResponse::InternalError(
            "Failed to load token verifying key".into(),
        ));
    };

    let key = match key_cache.get() {
        Ok(k) => k,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to load token verifying key".into(),
            ));
        }
    };

    Ok(decoded_token.verify(&key)?)
}
