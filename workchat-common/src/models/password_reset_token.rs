use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::password_reset_tokens;

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = password_reset_tokens, primary_key(token_hash))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PasswordResetToken {
    pub token_hash: Vec<u8>,
    pub user_id: i32,
    pub expiration: SystemTime,
    pub used: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = password_reset_tokens, primary_key(token_hash))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPasswordResetToken<'a> {
    pub token_hash: &'a [u8],
    pub user_id: i32,
    pub expiration: SystemTime,
    pub used: bool,
}
