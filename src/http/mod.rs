//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, timeout, body limit, no-store)
//!     → context.rs (path segments, identity, session handle, cookies)
//!     → pipeline.rs (ordered handlers, first claim wins, else 404)
//!         health → auth → plans → templates → highlights → snippets
//!         → backup → preflight
//!     → response.rs / error.rs (ETag, 304, JSON error bodies)
//!     → Set-Cookie for every cookie the handler queued
//! ```

pub mod context;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod response;
pub mod server;

pub use context::RequestContext;
pub use error::ApiError;
pub use pipeline::{Dispatch, Pipeline, ResourceHandler};
pub use server::{AppState, HttpServer, X_REQUEST_ID};
