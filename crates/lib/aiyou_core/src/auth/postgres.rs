//! PostgreSQL credential store.

use async_trait::async_trait;
use sqlx::PgPool;

use super::store::{CredentialStore, StoreError, UserRecord};

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Credential store over the `users` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_record((email, password_hash, token): (String, String, Option<String>)) -> UserRecord {
    UserRecord {
        email,
        password_hash,
        token,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT email, password_hash, token FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_record))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT email, password_hash, token FROM users WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_record))
    }

    async fn create(&self, record: UserRecord) -> Result<(), StoreError> {
        let result = sqlx::query("INSERT INTO users (email, password_hash, token) VALUES ($1, $2, $3)")
            .bind(&record.email)
            .bind(&record.password_hash)
            .bind(&record.token)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(StoreError::Duplicate(record.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_token(&self, email: &str, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET token = $2 WHERE email = $1")
            .bind(email)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
