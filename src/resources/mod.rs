//! Managed resource types.
//!
//! # Data Flow
//! ```text
//! request payload (JSON)
//!     → Validate::validate_create / validate_update
//!     → Draft (typed, checked) or FieldErrors
//!     → CollectionResource::create / apply  (inside the store mutator)
//!     → SingletonResource::replace          (whole document)
//! ```
//!
//! # Resources
//! - `plans.json`: [`Plan`] collection
//! - `templates.json`: [`Template`] collection
//! - `highlights.json`: [`HighlightConfig`] singleton
//! - `snippets.json`: [`SnippetLibrary`] singleton

pub mod fields;
pub mod highlights;
pub mod plan;
pub mod snippets;
pub mod template;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::session::Identity;
use crate::store::Identified;
use crate::versioning::Versioned;

pub use fields::{FieldError, FieldErrors, Validation};
pub use highlights::{HighlightConfig, HighlightRule, HighlightValidator};
pub use plan::{Plan, PlanValidator};
pub use snippets::{Snippet, SnippetLibrary, SnippetValidator};
pub use template::{Template, TemplateValidator};

/// Who changed a resource, and when.
#[derive(Debug, Clone)]
pub struct Stamp {
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl Stamp {
    pub fn now(actor: &Identity) -> Self {
        Self {
            actor: actor.id.clone(),
            at: Utc::now(),
        }
    }
}

/// Common bounds for anything held in a document store.
pub trait Resource: Versioned + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Validated client input for create/update.
    type Draft: Send + 'static;
}

/// A record inside a `{ nextId, items }` document.
pub trait CollectionResource: Resource + Identified {
    /// Path segment under `/api/` and document file stem.
    const KIND: &'static str;

    fn create(id: u64, draft: Self::Draft, stamp: &Stamp) -> Self;

    fn apply(&mut self, draft: Self::Draft, stamp: &Stamp);
}

/// A document replaced as a whole on every update.
pub trait SingletonResource: Resource + Default {
    const KIND: &'static str;

    fn replace(&mut self, draft: Self::Draft, stamp: &Stamp);

    /// Repair invariants before persisting.
    fn normalized(self) -> Self {
        self
    }
}

/// Validation collaborator for one resource type.
pub trait Validate<R: Resource>: Send + Sync {
    fn validate_create(&self, payload: &Value) -> Validation<R::Draft>;

    /// Fields absent from `payload` keep their value from `current`.
    fn validate_update(&self, payload: &Value, _current: &R) -> Validation<R::Draft> {
        self.validate_create(payload)
    }
}

/// `updatedAt` never precedes `createdAt`.
pub(crate) fn touch(created_at: DateTime<Utc>, at: DateTime<Utc>) -> DateTime<Utc> {
    at.max(created_at)
}

/// Deserialize `null` or a missing object as an empty map.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
