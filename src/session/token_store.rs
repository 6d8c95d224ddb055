//! Session token storage contract and the in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use serde::Serialize;

use crate::session::identity::Identity;

const TOKEN_BYTES: usize = 32;

/// A live authentication grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    pub identity: Identity,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session ttl out of range: {0:?}")]
    InvalidTtl(Duration),

    #[error("session backend error: {0}")]
    Backend(String),
}

/// Where sessions live. Implementations may return expired records;
/// expiry is enforced by `SessionManager`.
#[async_trait]
pub trait SessionTokenStore: Send + Sync {
    async fn create(&self, identity: Identity, ttl: Duration) -> Result<Session, SessionError>;

    async fn get(&self, token: &str) -> Result<Option<Session>, SessionError>;

    /// Returns whether a record was removed.
    async fn delete(&self, token: &str) -> Result<bool, SessionError>;

    /// Drop every record expired at `now`; returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError>;
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    sessions: DashMap<String, Session>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[async_trait]
impl SessionTokenStore for InMemoryTokenStore {
    async fn create(&self, identity: Identity, ttl: Duration) -> Result<Session, SessionError> {
        let lifetime = chrono::Duration::from_std(ttl).map_err(|_| SessionError::InvalidTtl(ttl))?;
        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or(SessionError::InvalidTtl(ttl))?;

        loop {
            let token = generate_token();
            if let Entry::Vacant(slot) = self.sessions.entry(token.clone()) {
                let session = Session {
                    token,
                    identity,
                    issued_at,
                    expires_at,
                };
                slot.insert(session.clone());
                return Ok(session);
            }
        }
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get(token).map(|r| r.value().clone()))
    }

    async fn delete(&self, token: &str) -> Result<bool, SessionError> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coach() -> Identity {
        Identity::new("u1", "coach")
    }

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = InMemoryTokenStore::new();
        let session = store.create(coach(), Duration::from_secs(60)).await.unwrap();

        let found = store.get(&session.token).await.unwrap().unwrap();
        assert_eq!(found.identity.username, "coach");
        assert!(found.expires_at > found.issued_at);

        assert!(store.delete(&session.token).await.unwrap());
        assert!(!store.delete(&session.token).await.unwrap());
        assert!(store.get(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryTokenStore::new();
        store.create(coach(), Duration::from_millis(1)).await.unwrap();
        store.create(coach(), Duration::from_secs(600)).await.unwrap();

        let removed = store
            .purge_expired(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }
}
