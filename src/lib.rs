//! Plan Store
//!
//! Durable JSON document storage for training plans, templates, snippet
//! libraries and highlight configuration, served over HTTP with optimistic
//! concurrency (entity tags, `If-Match` / `If-None-Match`).
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::context ──▶ http::pipeline
//!                          │                │                 │
//!                          │         session (identity)       ▼
//!                          │                          resource handlers
//!                          │                        │          │
//!                          │            conditional (412/428/304)
//!                          │                        │          │
//!                          │               versioning (ETag)   │
//!                          │                                   ▼
//!                          │                     store (FIFO queue, durable write)
//!                          │                                   │
//!     Client Response ◀────┘◀──────────────────────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

// Core subsystems
pub mod conditional;
pub mod resources;
pub mod session;
pub mod store;
pub mod versioning;

// Serving
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
