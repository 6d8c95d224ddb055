//! Durable JSON document storage.
//!
//! # Data Flow
//! ```text
//! open(path, options)
//!     → read file (or write normalized default when absent)
//!     → on parse failure: corruption policy → replacement or fatal error
//!     → canonical state (generation 0)
//!
//! update(mutator)
//!     → FIFO slot (one mutation at a time per document)
//!     → mutator(&mut deep copy)        (Err aborts, nothing written)
//!     → normalize
//!     → durable.rs: temp file → fsync → rename → directory fsync
//!     → swap canonical state, generation += 1, invalidate tag cache
//!
//! snapshot()
//!     → lock-free load of the last committed state
//! ```
//!
//! # Design Decisions
//! - Canonical state only changes after the write is durable
//! - One server process owns each document file; no cross-process locking
//! - A granted mutation runs to completion even if its caller goes away

pub mod collection;
pub mod document;
pub mod durable;
pub mod error;
pub mod recovery;
pub mod registry;

pub use collection::{Collection, Identified};
pub use document::{DocumentStore, Snapshot, StoreOptions};
pub use error::{StoreError, UpdateError};
pub use recovery::CorruptDocument;
pub use registry::Stores;
