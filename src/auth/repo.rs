use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{RefreshTokenRecord, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Database(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user whose password has already been hashed.
    async fn create(&self, email: &str, hashed_password: &str) -> StoreResult<User>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<RefreshTokenRecord>;

    /// Returns the record for `raw_token` if it belongs to `user_id` and has not expired.
    async fn find_by_owner_and_token(
        &self,
        user_id: Uuid,
        raw_token: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Deletes every refresh token of `user_id`, returning how many were removed.
    async fn delete_all_for_owner(&self, user_id: Uuid) -> StoreResult<u64>;
}

/// Base64 SHA-256 digest of a raw refresh token.
pub fn hash_token(raw_token: &str) -> String {
    Base64::encode_string(&Sha256::digest(raw_token.as_bytes()))
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, email: &str, hashed_password: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            RETURNING id, email, hashed_password, created_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenStore {
    db: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<RefreshTokenRecord> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (user_id, hashed_token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, hashed_token, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(hash_token(raw_token))
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }

    async fn find_by_owner_and_token(
        &self,
        user_id: Uuid,
        raw_token: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT user_id, hashed_token, created_at, expires_at
            FROM refresh_tokens
            WHERE user_id = $1 AND hashed_token = $2 AND expires_at > now()
            "#,
        )
        .bind(user_id)
        .bind(hash_token(raw_token))
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn delete_all_for_owner(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
