use diesel::{
    dsl, BoolExpressionMethods, Connection, ExpressionMethods, OptionalExtension, QueryDsl,
    RunQueryDsl,
};
use std::time::SystemTime;

use crate::db::{DaoError, DbThreadPool};
use crate::models::password_reset_token::NewPasswordResetToken;
use crate::schema::password_reset_tokens as reset_fields;
use crate::schema::password_reset_tokens::dsl::password_reset_tokens;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn save_password_reset(
        &self,
        token_hash: &[u8],
        user_id: i32,
        expiration: SystemTime,
    ) -> Result<(), DaoError> {
        let new_token = NewPasswordResetToken {
            token_hash,
            user_id,
            expiration,
            used: false,
        };

        dsl::insert_into(password_reset_tokens)
            .values(&new_token)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    /// Sets the password of the user the reset token belongs to and burns the token.
    /// Returns the user's ID, or `None` if the token is unknown, used or expired.
    pub fn reset_password(
        &self,
        token_hash: &[u8],
        new_password_hash: &str,
    ) -> Result<Option<i32>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection.transaction::<_, DaoError, _>(|conn| {
            let user_id = dsl::update(
                password_reset_tokens
                    .find(token_hash)
                    .filter(reset_fields::used.eq(false))
                    .filter(reset_fields::expiration.gt(SystemTime::now())),
            )
            .set(reset_fields::used.eq(true))
            .returning(reset_fields::user_id)
            .get_result::<i32>(conn)
            .optional()?;

            let Some(user_id) = user_id else {
                return Ok(None);
            };

            dsl::update(users.find(user_id))
                .set(user_fields::password_hash.eq(new_password_hash))
                .execute(conn)?;

            Ok(Some(user_id))
        })
    }

    pub fn delete_expired_password_resets(&self) -> Result<usize, DaoError> {
        Ok(dsl::delete(
            password_reset_tokens.filter(
                reset_fields::expiration
                    .lt(SystemTime::now())
                    .or(reset_fields::used.eq(true)),
            ),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}
