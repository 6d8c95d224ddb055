//! Conditional request protocol.
//!
//! # Responsibilities
//! - Parse `If-Match` / `If-None-Match` into a [`Precondition`]
//! - Decide read outcomes (200 / 304) and write outcomes (proceed / 412 / 428)
//!
//! # Data Flow
//! ```text
//! headers → precondition.rs (split, wildcard, weak prefix)
//!         → decision.rs evaluate_read / evaluate_write against the current tag
//!         → Decision consumed by the resource handlers
//! ```
//!
//! # Design Decisions
//! - An empty header is the same as no header
//! - Weak validators compare equal to their strong counterpart
//! - Handlers evaluate once against a snapshot and again inside the store
//!   mutator, so the queue cannot let a stale precondition through

pub mod decision;
pub mod precondition;

pub use decision::{evaluate_read, evaluate_write, Decision};
pub use precondition::{if_match, if_none_match, Precondition};
