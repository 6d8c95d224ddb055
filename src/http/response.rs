//! Response builders shared by the resource handlers.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::versioning::EntityTag;

/// Header names a browser client may send on API calls.
const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, If-Match, If-None-Match";
const CORS_EXPOSE_HEADERS: &str = "ETag, X-Request-Id, Location";

/// JSON body with its entity tag.
pub fn tagged<T: Serialize>(status: StatusCode, body: &T, tag: &EntityTag) -> Response {
    let mut response = (status, Json(body)).into_response();
    set_etag(&mut response, tag);
    response
}

/// 304 with the current tag and no body.
pub fn not_modified(tag: &EntityTag) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    set_etag(&mut response, tag);
    response
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn created<T: Serialize>(body: &T, tag: &EntityTag, location: &str) -> Response {
    let mut response = tagged(StatusCode::CREATED, body, tag);
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Untagged JSON.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, Json(body)).into_response()
}

/// 204 answer to `OPTIONS`.
pub fn preflight(allow: &'static str, allow_origin: &str) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ALLOW, HeaderValue::from_static(allow));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(allow));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(CORS_EXPOSE_HEADERS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("600"));
    if let Ok(origin) = HeaderValue::from_str(allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    if allow_origin != "*" {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    response
}

fn set_etag(response: &mut Response, tag: &EntityTag) {
    if let Ok(value) = HeaderValue::from_str(tag.as_str()) {
        response.headers_mut().insert(header::ETAG, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_modified_has_tag_and_no_body() {
        let response = not_modified(&EntityTag::from_quoted("\"t\""));
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::ETAG], "\"t\"");
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_preflight_headers() {
        let response = preflight("GET, PUT, OPTIONS", "https://coach.example");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::ALLOW], "GET, PUT, OPTIONS");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let open = preflight("GET, OPTIONS", "*");
        assert!(open.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }
}
