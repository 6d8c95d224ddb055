//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → open stores → sessions & users → handler pipeline → bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal or trigger → stop accepting → finish in-flight requests
//!     → close every store (pending mutations drained) → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: stores first, listener last (traffic only when ready)
//! - A store that cannot open (e.g. corrupt without a recovery policy) is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Application, StartupError};
