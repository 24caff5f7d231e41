use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{
    jwt::JwtKeys,
    repo::{PgRefreshTokenStore, PgUserStore},
    services::AuthService,
};
use crate::config::AppConfig;

/// Everything a handler needs; built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
}

impl AppState {
    /// Wires the Postgres-backed stores and the signing keys.
    pub fn init(config: &AppConfig, db: PgPool) -> Self {
        let auth = AuthService::new(
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgRefreshTokenStore::new(db)),
            JwtKeys::from_config(config),
        );
        Self { auth }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::auth::memory::{MemoryRefreshTokenStore, MemoryUserStore};

        let keys = JwtKeys::new(b"test", "http://127.0.0.1:8080");
        let auth = AuthService::new(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryRefreshTokenStore::default()),
            keys,
        );
        Self { auth }
    }
}
