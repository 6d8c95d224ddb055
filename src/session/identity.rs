//! Who is making a request.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::session::cookie::find_cookie;
use crate::session::manager::SessionManager;

pub const X_USER_ID: &str = "x-user-id";
pub const X_USER_NAME: &str = "x-user-name";
pub const X_USER_ROLES: &str = "x-user-roles";
pub const X_USER_ADMIN: &str = "x-user-admin";

/// An authenticated user as seen by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub roles: BTreeSet<String>,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles: BTreeSet::new(),
            is_admin: false,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Outcome of identity resolution for one request.
#[derive(Debug, Clone, Default)]
pub struct ResolvedIdentity {
    pub identity: Option<Identity>,
    /// The session token presented, valid or not.
    pub token: Option<String>,
}

/// Maps request headers to an identity.
pub struct IdentitySource {
    sessions: Arc<SessionManager>,
    trust_headers: bool,
}

impl IdentitySource {
    pub fn new(sessions: Arc<SessionManager>, trust_headers: bool) -> Self {
        Self {
            sessions,
            trust_headers,
        }
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> ResolvedIdentity {
        let token = session_token(headers, self.sessions.cookie_name());

        if let Some(token) = &token {
            match self.sessions.lookup(token).await {
                Ok(Some(session)) => {
                    return ResolvedIdentity {
                        identity: Some(session.identity),
                        token: Some(token.clone()),
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::error!(error = %err, "Session lookup failed"),
            }
        }

        let identity = if self.trust_headers {
            header_identity(headers)
        } else {
            None
        };
        ResolvedIdentity { identity, token }
    }
}

/// Token from the session cookie, else from `Authorization: Bearer`.
fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| find_cookie(v, cookie_name))
        .filter(|t| !t.is_empty());
    if let Some(token) = from_cookie {
        return Some(token.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Identity asserted by a trusted internal caller.
fn header_identity(headers: &HeaderMap) -> Option<Identity> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let id = get(X_USER_ID)?;
    let username = get(X_USER_NAME).unwrap_or(id);
    let roles: BTreeSet<String> = get(X_USER_ROLES)
        .map(|r| {
            r.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let is_admin = matches!(get(X_USER_ADMIN), Some("1") | Some("true")) || roles.contains("admin");

    Some(Identity {
        id: id.to_string(),
        username: username.to_string(),
        roles,
        is_admin,
    })
}
