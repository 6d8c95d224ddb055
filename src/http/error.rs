//! API error taxonomy and its HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::resources::FieldErrors;
use crate::session::SessionError;
use crate::store::{StoreError, UpdateError};
use crate::versioning::EntityTag;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("administrator access required")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed { allow: &'static str },

    #[error("resource has changed since it was read")]
    PreconditionFailed { current: Value, tag: EntityTag },

    #[error("If-Match header is required for this request")]
    PreconditionRequired,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("session failure: {0}")]
    Session(#[from] SessionError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<&'a Value>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            ApiError::PreconditionRequired => StatusCode::PRECONDITION_REQUIRED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Storage(_) | ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::PreconditionFailed { .. } => "precondition_failed",
            ApiError::PreconditionRequired => "precondition_required",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::Storage(_) | ApiError::Session(_) => "internal_error",
        }
    }

    /// Message safe to show a client. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) | ApiError::Session(_) => {
                "The request could not be completed; retry after re-reading the resource".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl<E: Into<ApiError>> From<UpdateError<E>> for ApiError {
    fn from(err: UpdateError<E>) -> Self {
        match err {
            UpdateError::Rejected(e) => e.into(),
            UpdateError::Store(e) => ApiError::Storage(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Storage(err) => tracing::error!(error = ?err, "Storage failure"),
            ApiError::Session(err) => tracing::error!(error = ?err, "Session backend failure"),
            other => tracing::debug!(status = status.as_u16(), reason = %other, "Request rejected"),
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.public_message(),
            fields: match &self {
                ApiError::Validation(fields) => Some(fields),
                _ => None,
            },
            current: match &self {
                ApiError::PreconditionFailed { current, .. } => Some(current),
                _ => None,
            },
        };
        let mut response = (status, Json(body)).into_response();

        match &self {
            ApiError::MethodNotAllowed { allow } => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static(*allow));
            }
            ApiError::PreconditionFailed { tag, .. } => {
                if let Ok(value) = HeaderValue::from_str(tag.as_str()) {
                    response.headers_mut().insert(header::ETAG, value);
                }
            }
            _ => {}
        }
        response
    }
}
