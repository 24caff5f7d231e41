use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{hash_token, RefreshTokenStore, StoreError, StoreResult, UserStore};
use super::repo_types::{RefreshTokenRecord, User};

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

/// In-process stand-in for the users table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    fail_lookups: AtomicBool,
    stale_lookups: AtomicBool,
}

impl MemoryUserStore {
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Makes `find_by_email` miss, as a read that lost a race with a concurrent insert would.
    pub fn stale_lookups(&self, stale: bool) {
        self.stale_lookups.store(stale, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, hashed_password: &str) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check()?;
        if self.stale_lookups.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check()?;
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

/// In-process stand-in for the refresh_tokens table.
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    rows: Mutex<Vec<RefreshTokenRecord>>,
    fail_inserts: AtomicBool,
    collide_inserts: AtomicBool,
}

impl MemoryRefreshTokenStore {
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes inserts fail with a unique violation.
    pub fn collide_inserts(&self, collide: bool) {
        self.collide_inserts.store(collide, Ordering::SeqCst);
    }

    pub fn count_for_owner(&self, user_id: Uuid) -> usize {
        let rows = self.rows.lock().unwrap();
        rows.iter().filter(|r| r.user_id == user_id).count()
    }

    pub fn rows_for_owner(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        let rows = self.rows.lock().unwrap();
        rows.iter().filter(|r| r.user_id == user_id).cloned().collect()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn create(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<RefreshTokenRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if self.collide_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Duplicate);
        }
        let record = RefreshTokenRecord {
            user_id,
            hashed_token: hash_token(raw_token),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        };
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.user_id == user_id && r.hashed_token == record.hashed_token)
        {
            return Err(StoreError::Duplicate);
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_owner_and_token(
        &self,
        user_id: Uuid,
        raw_token: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let hashed = hash_token(raw_token);
        let now = OffsetDateTime::now_utc();
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.user_id == user_id && r.hashed_token == hashed && r.expires_at > now)
            .cloned())
    }

    async fn delete_all_for_owner(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn in_a_month() -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::from_secs(30 * 24 * 60 * 60)
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = MemoryRefreshTokenStore::default();
        let user_id = Uuid::new_v4();
        let created = store.create(user_id, "raw-token", in_a_month()).await.unwrap();
        assert_eq!(created.hashed_token, hash_token("raw-token"));
        assert_ne!(created.hashed_token, "raw-token");

        let found = store.find_by_owner_and_token(user_id, "raw-token").await.unwrap();
        assert_eq!(found, Some(created));

        let other = store.find_by_owner_and_token(user_id, "other-token").await.unwrap();
        assert!(other.is_none());

        let stranger = store
            .find_by_owner_and_token(Uuid::new_v4(), "raw-token")
            .await
            .unwrap();
        assert!(stranger.is_none());
    }

    #[tokio::test]
    async fn expired_rows_are_not_found() {
        let store = MemoryRefreshTokenStore::default();
        let user_id = Uuid::new_v4();
        let past = OffsetDateTime::now_utc() - Duration::from_secs(1);
        store.create(user_id, "stale", past).await.unwrap();
        assert!(store.find_by_owner_and_token(user_id, "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_all_is_idempotent_and_scoped_to_owner() {
        let store = MemoryRefreshTokenStore::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create(alice, "a1", in_a_month()).await.unwrap();
        store.create(alice, "a2", in_a_month()).await.unwrap();
        store.create(bob, "b1", in_a_month()).await.unwrap();

        assert_eq!(store.delete_all_for_owner(alice).await.unwrap(), 2);
        assert_eq!(store.delete_all_for_owner(alice).await.unwrap(), 0);
        assert_eq!(store.count_for_owner(alice), 0);
        assert_eq!(store.count_for_owner(bob), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryUserStore::default();
        let user = store.create("a@b.com", "hash").await.unwrap();
        assert!(matches!(
            store.create("a@b.com", "hash").await,
            Err(StoreError::Duplicate)
        ));
        // emails are matched exactly as stored
        assert!(store.find_by_email("A@B.com").await.unwrap().is_none());
        assert_eq!(store.find_by_id(user.id).await.unwrap().unwrap().email, "a@b.com");
    }
}
