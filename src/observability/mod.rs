//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing subscriber: pretty / compact / json)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured filter
//! - Every request runs in a `request` span carrying its request ID
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
