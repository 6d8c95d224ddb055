//! Session lifecycle: issue, look up, revoke.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::observability::metrics;
use crate::session::cookie::{Cookie, CookieSettings};
use crate::session::identity::Identity;
use crate::session::token_store::{Session, SessionError, SessionTokenStore};

pub struct SessionManager {
    store: Arc<dyn SessionTokenStore>,
    ttl: Duration,
    cookies: CookieSettings,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionTokenStore>, ttl: Duration, cookies: CookieSettings) -> Self {
        Self { store, ttl, cookies }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookies.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session and the cookie that carries its token.
    pub async fn issue(&self, identity: Identity, secure: bool) -> Result<(Session, Cookie), SessionError> {
        let session = self.store.create(identity, self.ttl).await?;
        metrics::record_session_event("issued");
        tracing::info!(user = %session.identity.username, expires_at = %session.expires_at, "Session issued");

        let cookie = Cookie::session(&self.cookies, session.token.clone(), self.ttl, secure);
        Ok((session, cookie))
    }

    /// Live session for `token`. Expired records are removed and reported absent.
    pub async fn lookup(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let Some(session) = self.store.get(token).await? else {
            return Ok(None);
        };

        if session.is_expired_at(Utc::now()) {
            self.store.delete(token).await?;
            metrics::record_session_event("expired");
            tracing::debug!(user = %session.identity.username, "Session expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Delete the session (if any) and build the expiring cookie.
    pub async fn revoke(&self, token: Option<&str>, secure: bool) -> Result<Cookie, SessionError> {
        if let Some(token) = token {
            if self.store.delete(token).await? {
                metrics::record_session_event("revoked");
                tracing::info!("Session revoked");
            }
        }
        Ok(Cookie::expired(&self.cookies, secure))
    }

    /// Remove every expired record from the backing store.
    pub async fn sweep(&self) -> Result<usize, SessionError> {
        let removed = self.store.purge_expired(Utc::now()).await?;
        if removed > 0 {
            metrics::record_sessions_swept(removed);
            tracing::debug!(removed, "Expired sessions swept");
        }
        Ok(removed)
    }
}
