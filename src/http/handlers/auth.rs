//! `/api/auth/login`, `/api/auth/logout`, `/api/auth/session`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use serde_json::json;

use crate::http::context::RequestContext;
use crate::http::error::ApiError;
use crate::http::pipeline::{Dispatch, ResourceHandler};
use crate::http::response;
use crate::observability::metrics;
use crate::resources::fields::{self, FieldErrors};
use crate::session::{SessionError, UserDirectory};

const POST_ALLOW: &str = "POST, OPTIONS";
const GET_ALLOW: &str = "GET, OPTIONS";

pub struct AuthHandler {
    users: Arc<UserDirectory>,
    allow_origin: String,
}

impl AuthHandler {
    pub fn new(users: Arc<UserDirectory>, allow_origin: impl Into<String>) -> Self {
        Self {
            users,
            allow_origin: allow_origin.into(),
        }
    }

    async fn login(&self, ctx: &mut RequestContext) -> Result<Response, ApiError> {
        let payload = ctx.json_body()?;
        let mut errors = FieldErrors::new();
        let Some(map) = fields::object(&payload, &mut errors) else {
            return Err(ApiError::Validation(errors));
        };
        let username = fields::required_string(map, "username", None, 200, &mut errors);
        let password = fields::string(map, "password", None, &mut errors).filter(|p| !p.is_empty());
        if password.is_none() && !errors.iter().any(|e| e.field == "password") {
            errors.push("password", "is required");
        }
        let (Some(username), Some(password)) = (username, password) else {
            return Err(ApiError::Validation(errors));
        };

        // Argon2 verification blocks; run it on the blocking pool.
        let users = self.users.clone();
        let verified = tokio::task::spawn_blocking(move || users.verify(&username, &password))
            .await
            .map_err(|err| SessionError::Backend(format!("credential check interrupted: {}", err)))?;

        let Some(identity) = verified else {
            metrics::record_session_event("rejected");
            tracing::info!("Login rejected");
            return Err(ApiError::Unauthorized("invalid username or password"));
        };

        let (session, cookie) = ctx.session.issue(identity).await?;
        ctx.push_cookie(cookie);
        Ok(response::json(
            StatusCode::OK,
            &json!({ "identity": session.identity, "expiresAt": session.expires_at }),
        ))
    }

    /// Always clears the client's cookie, even when its session is already gone.
    async fn logout(&self, ctx: &mut RequestContext) -> Result<Response, ApiError> {
        let cookie = ctx.session.clear().await?;
        ctx.push_cookie(cookie);
        Ok(response::no_content())
    }

    fn current(&self, ctx: &RequestContext) -> Result<Response, ApiError> {
        let identity = ctx.require_identity()?;
        Ok(response::json(StatusCode::OK, &json!({ "identity": identity })))
    }
}

#[async_trait]
impl ResourceHandler for AuthHandler {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
        let action = match ctx.segments().as_slice() {
            ["api", "auth", action @ ("login" | "logout" | "session")] => action.to_string(),
            _ => return Ok(Dispatch::NotHandled),
        };
        let allow = if action == "session" { GET_ALLOW } else { POST_ALLOW };

        let method = ctx.method.clone();
        let response = match (action.as_str(), method) {
            (_, Method::OPTIONS) => response::preflight(allow, &self.allow_origin),
            ("login", Method::POST) => self.login(ctx).await?,
            ("logout", Method::POST) => self.logout(ctx).await?,
            ("session", Method::GET) => self.current(ctx)?,
            _ => return Err(ApiError::MethodNotAllowed { allow }),
        };
        Ok(Dispatch::Handled(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use crate::http::context::test_support::{context, with_body};
    use crate::session::credentials::hash_password;
    use crate::session::Identity;

    fn handler() -> AuthHandler {
        let users = UserDirectory::from_config(&[UserConfig {
            id: Some("u1".into()),
            username: "coach".into(),
            password_hash: hash_password("s3cret").unwrap(),
            roles: vec!["coach".into()],
            admin: false,
        }]);
        AuthHandler::new(Arc::new(users), "*")
    }

    async fn run(handler: &AuthHandler, ctx: &mut RequestContext) -> Result<Response, ApiError> {
        match handler.handle(ctx).await? {
            Dispatch::Handled(response) => Ok(response),
            Dispatch::NotHandled => panic!("path not claimed"),
        }
    }

    #[tokio::test]
    async fn test_login_issues_cookie() {
        let handler = handler();
        let mut ctx = with_body(
            context(Method::POST, "/api/auth/login", None),
            json!({ "username": "coach", "password": "s3cret" }),
        );
        let response = run(&handler, &mut ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookies = ctx.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(!cookies[0].value.is_empty());
        assert!(cookies[0].http_only);
    }

    #[tokio::test]
    async fn test_bad_password_is_401() {
        let handler = handler();
        let mut ctx = with_body(
            context(Method::POST, "/api/auth/login", None),
            json!({ "username": "coach", "password": "nope" }),
        );
        assert!(matches!(run(&handler, &mut ctx).await, Err(ApiError::Unauthorized(_))));
        assert!(ctx.take_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_login_payload_is_validated() {
        let handler = handler();
        let mut ctx = with_body(context(Method::POST, "/api/auth/login", None), json!({}));
        match run(&handler, &mut ctx).await {
            Err(ApiError::Validation(errors)) => assert_eq!(errors.iter().count(), 2),
            other => panic!("unexpected: {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let handler = handler();
        let mut ctx = context(Method::POST, "/api/auth/logout", Some(Identity::new("u1", "coach")));
        assert_eq!(run(&handler, &mut ctx).await.unwrap().status(), StatusCode::NO_CONTENT);
        assert!(ctx.take_cookies()[0].is_expiring());

    }

    #[tokio::test]
    async fn test_logout_with_expired_session_still_clears_cookie() {
        let handler = handler();
        let mut anonymous = context(Method::POST, "/api/auth/logout", None);
        let response = run(&handler, &mut anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let cookies = anonymous.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].is_expiring());
    }

    #[tokio::test]
    async fn test_session_endpoint() {
        let handler = handler();
        let mut ctx = context(Method::GET, "/api/auth/session", Some(Identity::new("u1", "coach")));
        assert_eq!(run(&handler, &mut ctx).await.unwrap().status(), StatusCode::OK);

        let mut ctx = context(Method::POST, "/api/auth/session", None);
        assert!(matches!(run(&handler, &mut ctx).await, Err(ApiError::MethodNotAllowed { .. })));
    }
}
