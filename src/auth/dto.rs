use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Request body for signin.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens returned after signin or refresh.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("empty {field}")));
    }
    Ok(())
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

impl SigninRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require("refresh_token", &self.refresh_token)
    }
}
