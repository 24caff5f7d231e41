use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub email: String,              // user email, unique as stored
    #[serde(skip_serializing)]
    pub hashed_password: String,    // Argon2 PHC string, not exposed in JSON
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Stored refresh token. Only the digest of the token ever reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshTokenRecord {
    pub user_id: Uuid,
    pub hashed_token: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}
