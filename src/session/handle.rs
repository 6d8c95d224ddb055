//! Per-request session control for handlers.

use std::sync::Arc;

use crate::session::cookie::Cookie;
use crate::session::identity::Identity;
use crate::session::manager::SessionManager;
use crate::session::token_store::{Session, SessionError};

/// Lets a handler start or end the caller's session. Returned cookies
/// must be attached to the response.
#[derive(Clone)]
pub struct SessionHandle {
    manager: Arc<SessionManager>,
    token: Option<String>,
    secure: bool,
}

impl SessionHandle {
    pub fn new(manager: Arc<SessionManager>, token: Option<String>, secure: bool) -> Self {
        Self { manager, token, secure }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Start a new session, ending any session presented with the request.
    pub async fn issue(&mut self, identity: Identity) -> Result<(Session, Cookie), SessionError> {
        if let Some(previous) = self.token.take() {
            self.manager.revoke(Some(&previous), self.secure).await?;
        }
        let (session, cookie) = self.manager.issue(identity, self.secure).await?;
        self.token = Some(session.token.clone());
        Ok((session, cookie))
    }

    pub async fn clear(&mut self) -> Result<Cookie, SessionError> {
        let token = self.token.take();
        self.manager.revoke(token.as_deref(), self.secure).await
    }
}
