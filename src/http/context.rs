//! Per-request state threaded through the handler pipeline.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::session::{Cookie, Identity, SessionHandle};

/// Built fresh for every request and dropped with it.
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Resolved from a live session or trusted identity headers.
    pub identity: Option<Identity>,
    pub session: SessionHandle,
    /// Reached over TLS (directly or behind a proxy).
    pub secure: bool,
    segments: Vec<String>,
    cookies: Vec<Cookie>,
}

/// Inputs for [`RequestContext::new`].
pub struct RequestParts {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub identity: Option<Identity>,
    pub session: SessionHandle,
    pub secure: bool,
}

impl RequestContext {
    pub fn new(parts: RequestParts) -> Self {
        let segments = parts
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            request_id: parts.request_id,
            method: parts.method,
            path: parts.path,
            headers: parts.headers,
            body: parts.body,
            identity: parts.identity,
            session: parts.session,
            secure: parts.secure,
            segments,
            cookies: Vec::new(),
        }
    }

    /// Non-empty path segments (`/api/plans/3` → `["api", "plans", "3"]`).
    pub fn segments(&self) -> Vec<&str> {
        self.segments.iter().map(String::as_str).collect()
    }

    pub fn is_api(&self) -> bool {
        self.segments.first().is_some_and(|s| s == "api")
    }

    pub fn require_identity(&self) -> Result<&Identity, ApiError> {
        self.identity
            .as_ref()
            .ok_or(ApiError::Unauthorized("authentication required"))
    }

    pub fn require_admin(&self) -> Result<&Identity, ApiError> {
        let identity = self.require_identity()?;
        if identity.is_admin {
            Ok(identity)
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// The body parsed as JSON.
    pub fn json_body(&self) -> Result<Value, ApiError> {
        if self.body.is_empty() {
            return Err(ApiError::BadRequest("request body must be a JSON document".to_string()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|err| ApiError::BadRequest(format!("malformed JSON: {}", err)))
    }

    /// Queue a `Set-Cookie` for the response.
    pub fn push_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    pub fn take_cookies(&mut self) -> Vec<Cookie> {
        std::mem::take(&mut self.cookies)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::HeaderValue;

    use crate::session::{CookieSettings, InMemoryTokenStore, SessionManager};

    pub(crate) fn manager() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            Arc::new(InMemoryTokenStore::new()),
            Duration::from_secs(60),
            CookieSettings::default(),
        ))
    }

    /// Context for handler tests.
    pub(crate) fn context(method: Method, path: &str, identity: Option<Identity>) -> RequestContext {
        RequestContext::new(RequestParts {
            request_id: "test".to_string(),
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            identity,
            session: SessionHandle::new(manager(), None, false),
            secure: false,
        })
    }

    pub(crate) fn with_body(mut ctx: RequestContext, body: Value) -> RequestContext {
        ctx.body = Bytes::from(body.to_string());
        ctx
    }

    pub(crate) fn with_header(mut ctx: RequestContext, name: &'static str, value: &str) -> RequestContext {
        if let Ok(value) = HeaderValue::from_str(value) {
            ctx.headers.insert(name, value);
        }
        ctx
    }
}
