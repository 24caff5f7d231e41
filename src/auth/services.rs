use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    claims::Claims,
    dto::{PublicUser, RefreshRequest, SigninRequest, SignupRequest, TokenResponse},
    jwt::{JwtKeys, TokenPair},
    password::{hash_password_blocking, verify_password_blocking},
    repo::{RefreshTokenStore, StoreError, UserStore},
};
use crate::error::AppError;

/// Signup, signin and refresh-token rotation on top of the two stores and the key set.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        keys: JwtKeys,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn signup(&self, req: SignupRequest) -> Result<(), AppError> {
        req.validate()?;

        if self.users.find_by_email(&req.email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::Conflict("email already registered".into()));
        }

        let hash = hash_password_blocking(req.password).await?;
        // a concurrent signup can still win the race to the unique index
        let user = self
            .users
            .create(&req.email, &hash)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => AppError::Conflict("email already registered".into()),
                other => other.into(),
            })?;

        info!(user_id = %user.id, "user signed up");
        Ok(())
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn signin(&self, req: SigninRequest) -> Result<TokenResponse, AppError> {
        req.validate()?;

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            warn!("signin unknown email");
            return Err(AppError::Unauthorized);
        };

        if !verify_password_blocking(req.password, user.hashed_password).await? {
            warn!(user_id = %user.id, "signin invalid password");
            return Err(AppError::Unauthorized);
        }

        let pair = self.rotate(user.id).await?;
        info!(user_id = %user.id, "user signed in");
        Ok(pair)
    }

    #[instrument(skip(self, req))]
    pub async fn refresh(&self, req: RefreshRequest) -> Result<TokenResponse, AppError> {
        req.validate()?;

        let claims = self.keys.parse(&req.refresh_token).map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            AppError::InvalidToken("invalid or expired token")
        })?;
        if self.keys.is_access_token(&claims) {
            warn!(user_id = %claims.sub, "access token presented for refresh");
            return Err(AppError::InvalidToken("refresh token required"));
        }

        let stored = self
            .refresh_tokens
            .find_by_owner_and_token(claims.sub, &req.refresh_token)
            .await?;
        if stored.is_none() {
            warn!(user_id = %claims.sub, "refresh token not on record");
            return Err(AppError::InvalidToken("refresh token is no longer valid"));
        }

        let pair = self.rotate(claims.sub).await?;
        info!(user_id = %claims.sub, "refresh token rotated");
        Ok(pair)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(PublicUser {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        })
    }

    /// Issues a fresh pair and replaces whatever refresh tokens the user had.
    ///
    /// Order matters: sign, then delete, then persist. A failure after the delete
    /// leaves the user with no stored refresh token rather than two.
    async fn rotate(&self, user_id: Uuid) -> Result<TokenResponse, AppError> {
        let TokenPair { access, refresh } = self.keys.generate_token_pair(user_id)?;

        let removed = self.refresh_tokens.delete_all_for_owner(user_id).await?;
        self.refresh_tokens
            .create(user_id, &refresh.raw, refresh.expires_at())
            .await?;

        tracing::debug!(user_id = %user_id, removed, "refresh token stored");
        Ok(TokenResponse {
            access_token: access.raw,
            refresh_token: refresh.raw,
        })
    }
}

/// Parses a bearer token and insists on an access token.
pub fn authenticate_access(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    let claims = keys.parse(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::InvalidToken("invalid or expired token")
    })?;
    if !keys.is_access_token(&claims) {
        return Err(AppError::InvalidToken("access token required"));
    }
    Ok(claims)
}
