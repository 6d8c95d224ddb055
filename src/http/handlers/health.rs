//! `GET /health`: liveness, no authentication.

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::http::context::RequestContext;
use crate::http::error::ApiError;
use crate::http::pipeline::{Dispatch, ResourceHandler};
use crate::http::response;

pub struct HealthHandler;

#[async_trait]
impl ResourceHandler for HealthHandler {
    fn name(&self) -> &'static str {
        "health"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
        if ctx.segments() != ["health"] {
            return Ok(Dispatch::NotHandled);
        }
        if ctx.method != Method::GET {
            return Err(ApiError::MethodNotAllowed { allow: "GET" });
        }
        Ok(Dispatch::Handled(response::json(StatusCode::OK, &json!({ "status": "ok" }))))
    }
}
