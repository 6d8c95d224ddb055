//! Resource versioning subsystem.
//!
//! # Data Flow
//! ```text
//! resource (typed)
//!     → Versioned::tag_fields (explicit public fields only)
//!     → canonical.rs (recursively key-sorted JSON text)
//!     → tag.rs (SHA-256, lowercase hex, quoted)
//!     → EntityTag
//!
//! Per store:
//!     cache.rs memoizes tags for one commit generation
//!     → every successful commit starts a new generation
//! ```
//!
//! # Design Decisions
//! - Tags depend only on field values, never on in-memory key order
//! - Array element order is significant
//! - Bookkeeping fields are excluded by construction (fields are enumerated, not reflected)

pub mod cache;
pub mod canonical;
pub mod tag;

pub use cache::TagCache;
pub use tag::{compute_tag, EntityTag, Versioned};
