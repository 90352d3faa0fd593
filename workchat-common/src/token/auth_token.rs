use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use ed25519_dalek as ed25519;
use ed25519_dalek::Signer;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::token::{Ed25519Verifier, Expiring, Token, TokenError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: i32,
    #[serde(rename = "eml")]
    pub user_email: String,
    #[serde(rename = "mgr")]
    pub is_manager: bool,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewAuthTokenClaims<'a> {
    #[serde(rename = "uid")]
    pub user_id: i32,
    #[serde(rename = "eml")]
    pub user_email: &'a str,
    #[serde(rename = "mgr")]
    pub is_manager: bool,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

impl<'a> NewAuthTokenClaims<'a> {
    pub fn expiring_in(
        user_id: i32,
        user_email: &'a str,
        is_manager: bool,
        lifetime: Duration,
    ) -> Result<Self, TokenError> {
        let expiration = (SystemTime::now() + lifetime)
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TokenInvalid)?
            .as_secs();

        Ok(Self {
            user_id,
            user_email,
            is_manager,
            expiration,
        })
    }
}

impl Expiring for AuthTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

pub struct AuthToken {}

impl AuthToken {
    pub fn sign_new(
        claims: NewAuthTokenClaims,
        signing_key: &ed25519::SigningKey,
    ) -> Result<String, TokenError> {
        let mut token_unencoded =
            serde_json::to_vec(&claims).map_err(|_| TokenError::TokenInvalid)?;

        let signature = signing_key.sign(&token_unencoded);
        token_unencoded.extend_from_slice(&signature.to_bytes());

        Ok(b64_urlsafe.encode(&token_unencoded))
    }
}

impl Token for AuthToken {
    type Claims = AuthTokenClaims;
    type Verifier = Ed25519Verifier;

    fn token_name() -> &'static str {
        "AuthToken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signing_key = ed25519::SigningKey::generate(&mut crate::threadrand::SecureRng);
        let verifying_key = signing_key.verifying_key().to_bytes();

        let claims = NewAuthTokenClaims::expiring_in(
            7,
            "test1234@example.com",
            true,
            Duration::from_secs(60),
        )
        .unwrap();
        let exp = claims.expiration;

        let token = AuthToken::sign_new(claims, &signing_key).unwrap();
        let claims = AuthToken::decode(&token)
            .unwrap()
            .verify(&verifying_key)
            .unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.user_email, "test1234@example.com");
        assert!(claims.is_manager);
        assert_eq!(claims.expiration, exp);

        assert!(String::from_utf8_lossy(&b64_urlsafe.decode(&token).unwrap())
            .contains("\"mgr\":true"));
    }

    #[test]
    fn test_expired() {
        let signing_key = ed25519::SigningKey::generate(&mut crate::threadrand::SecureRng);
        let verifying_key = signing_key.verifying_key().to_bytes();

        let claims = NewAuthTokenClaims {
            user_id: 7,
            user_email: "test1234@example.com",
            is_manager: false,
            expiration: 1,
        };

        let token = AuthToken::sign_new(claims, &signing_key).unwrap();
        assert!(matches!(
            AuthToken::decode(&token).unwrap().verify(&verifying_key),
            Err(TokenError::TokenExpired)
        ));
    }
}
