use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::AppConfig, state::AppState};

pub const ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("error signing {kind:?} token: {source}")]
    Signing {
        kind: TokenKind,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    #[error("error parsing token: {0}")]
    Parsing(#[from] jsonwebtoken::errors::Error),
}

/// A signed token together with the claims it was parsed back into.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.claims.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.auth.keys().clone()
    }
}

impl JwtKeys {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            access_ttl: ACCESS_TTL,
            refresh_ttl: REFRESH_TTL,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt.secret.as_bytes(), config.issuer())
    }

    fn sign_with_kind(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
            kind,
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|source| TokenError::Signing { kind, source })?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    fn issue(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let raw = self.sign_with_kind(user_id, kind, now)?;
        let claims = self.parse(&raw)?;
        Ok(IssuedToken { raw, claims })
    }

    /// Signs an access/refresh pair for `user_id`, both stamped with the same issue time.
    pub fn generate_token_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        let now = OffsetDateTime::now_utc();
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access, now)?,
            refresh: self.issue(user_id, TokenKind::Refresh, now)?,
        })
    }

    /// Verifies signature, algorithm, issuer and expiry.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn is_access_token(&self, claims: &Claims) -> bool {
        claims.kind == TokenKind::Access
    }
}
