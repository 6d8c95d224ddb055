//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every request goes to the handler pipeline
//! - Wire up middleware (request ID, tracing, timeout, body limit, no-store)
//! - Build the per-request context (identity, session handle, secure flag)
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::http::context::{RequestContext, RequestParts};
use crate::http::error::ApiError;
use crate::http::pipeline::Pipeline;
use crate::observability::metrics;
use crate::session::{IdentitySource, SessionHandle, SessionManager};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub identity: Arc<IdentitySource>,
    pub sessions: Arc<SessionManager>,
    pub request_timeout: Duration,
    pub max_body_size: usize,
}

pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let timeout = state.request_timeout;
        let max_body = state.max_body_size;

        Router::new().fallback(dispatch).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(RequestBodyLimitLayer::new(max_body))
                .layer(TimeoutLayer::new(timeout)),
        )
    }

    /// Serve on `listener` until `shutdown` resolves, then let in-flight
    /// requests finish.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request: build a context, run the pipeline, attach cookies.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = parts.method.clone();
    let span = tracing::info_span!(
        "request",
        method = %method,
        path = %parts.uri.path(),
        request_id = %request_id,
    );

    let response = async {
        let body = match axum::body::to_bytes(body, state.max_body_size).await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(error = %err, "Request body rejected");
                return ApiError::PayloadTooLarge.into_response();
            }
        };

        let resolved = state.identity.resolve(&parts.headers).await;
        let secure = is_secure(&parts.headers);
        let mut ctx = RequestContext::new(RequestParts {
            request_id,
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body,
            identity: resolved.identity,
            session: SessionHandle::new(state.sessions.clone(), resolved.token, secure),
            secure,
        });

        let mut response = state.pipeline.dispatch(&mut ctx).await;
        for cookie in ctx.take_cookies() {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => tracing::error!(error = %err, "Unencodable cookie dropped"),
            }
        }
        response
    }
    .instrument(span)
    .await;

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

/// TLS is terminated upstream; trust the proxy's forwarded scheme.
fn is_secure(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}
