//! `OPTIONS` on any other `/api` path.

use async_trait::async_trait;
use axum::http::Method;

use crate::http::context::RequestContext;
use crate::http::error::ApiError;
use crate::http::pipeline::{Dispatch, ResourceHandler};
use crate::http::response;

const ALLOW: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Goes last so resource handlers can answer with their own `Allow`.
pub struct PreflightHandler {
    allow_origin: String,
}

impl PreflightHandler {
    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
        }
    }
}

#[async_trait]
impl ResourceHandler for PreflightHandler {
    fn name(&self) -> &'static str {
        "preflight"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
        if ctx.method != Method::OPTIONS || !ctx.is_api() {
            return Ok(Dispatch::NotHandled);
        }
        Ok(Dispatch::Handled(response::preflight(ALLOW, &self.allow_origin)))
    }
}
