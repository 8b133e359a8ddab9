use chrono::{NaiveDateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;

use crate::error::AppError;

#[cfg(not(test))]
const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const PASSWORD_COST: u32 = 4;

const TOKEN_LENGTH: usize = 48;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, PASSWORD_COST)?)
}

#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUserSession {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub token: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<DbUserSession> for UserSession {
    fn from(session: DbUserSession) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: session.id.unwrap_or_default(),
            user_id: session.user_id.unwrap_or_default(),
            token: session.token.unwrap_or_default(),
            created_at: session.created_at.unwrap_or(now),
            // A row without an expiry is treated as already expired.
            expires_at: session.expires_at.unwrap_or(now),
        }
    }
}

impl UserSession {
    pub fn generate_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now().naive_utc()
    }
}
