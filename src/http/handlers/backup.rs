//! `GET /api/backup`: every document in one response, for administrators.

use async_trait::async_trait;
use axum::http::{Method, StatusCode};

use crate::http::context::RequestContext;
use crate::http::error::ApiError;
use crate::http::pipeline::{Dispatch, ResourceHandler};
use crate::http::response;
use crate::store::Stores;
use crate::versioning::compute_tag;

const ALLOW: &str = "GET, OPTIONS";

pub struct BackupHandler {
    stores: Stores,
    allow_origin: String,
}

impl BackupHandler {
    pub fn new(stores: Stores, allow_origin: impl Into<String>) -> Self {
        Self {
            stores,
            allow_origin: allow_origin.into(),
        }
    }
}

#[async_trait]
impl ResourceHandler for BackupHandler {
    fn name(&self) -> &'static str {
        "backup"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
        if ctx.segments() != ["api", "backup"] {
            return Ok(Dispatch::NotHandled);
        }
        match ctx.method {
            Method::OPTIONS => return Ok(Dispatch::Handled(response::preflight(ALLOW, &self.allow_origin))),
            Method::GET => {}
            _ => return Err(ApiError::MethodNotAllowed { allow: ALLOW }),
        }

        let admin = ctx.require_admin()?;
        let backup = self.stores.backup()?;
        tracing::info!(user = %admin.username, "Backup exported");
        Ok(Dispatch::Handled(response::tagged(StatusCode::OK, &backup, &compute_tag(&backup))))
    }
}
