//! Resource handlers, in pipeline order.
//!
//! Each handler claims a fixed set of paths. On a claimed path it answers
//! `OPTIONS` itself, rejects unsupported methods with 405, and requires an
//! identity for everything else (except login, logout and health).

pub mod auth;
pub mod backup;
pub mod collection;
pub mod health;
pub mod preflight;
pub mod singleton;

pub use auth::AuthHandler;
pub use backup::BackupHandler;
pub use collection::CollectionHandler;
pub use health::HealthHandler;
pub use preflight::PreflightHandler;
pub use singleton::SingletonHandler;

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::conditional::{evaluate_read, evaluate_write, if_none_match, Decision, Precondition};
use crate::http::error::ApiError;
use crate::http::response;
use crate::store::StoreError;
use crate::versioning::EntityTag;

/// 200 with the representation, or 304 when `If-None-Match` matches `tag`.
pub(crate) fn conditional_read<T: Serialize>(headers: &HeaderMap, body: &T, tag: &EntityTag) -> Response {
    match evaluate_read(if_none_match(headers).as_ref(), tag) {
        Decision::NotModified => response::not_modified(tag),
        _ => response::tagged(StatusCode::OK, body, tag),
    }
}

/// Check `If-Match` against the state about to be written.
pub(crate) fn check_write<T: Serialize>(
    precondition: Option<&Precondition>,
    tag: &EntityTag,
    current: &T,
) -> Result<(), ApiError> {
    match evaluate_write(precondition, tag) {
        Decision::Proceed | Decision::NotModified => Ok(()),
        Decision::PreconditionRequired => Err(ApiError::PreconditionRequired),
        Decision::PreconditionFailed => Err(ApiError::PreconditionFailed {
            current: serde_json::to_value(current).map_err(StoreError::from)?,
            tag: tag.clone(),
        }),
    }
}
