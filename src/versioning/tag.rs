//! Entity tag computation.

use std::fmt;

use hex::ToHex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::versioning::canonical::to_canonical_string;

/// A quoted, strong entity tag (`"<sha256-hex>"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityTag(String);

impl EntityTag {
    /// Wrap an already-quoted tag without hashing.
    pub fn from_quoted(tag: impl Into<String>) -> Self {
        EntityTag(tag.into())
    }

    /// The tag exactly as it appears in an `ETag` header, quotes included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digest without surrounding quotes.
    pub fn opaque(&self) -> &str {
        self.0.trim_matches('"')
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Types that expose the fields making up their client-visible identity.
pub trait Versioned {
    /// The significant fields, as a JSON value. Internal bookkeeping must
    /// not appear here.
    fn tag_fields(&self) -> Value;

    fn entity_tag(&self) -> EntityTag {
        compute_tag(&self.tag_fields())
    }
}

/// Hash the canonical form of `fields` into an entity tag.
pub fn compute_tag(fields: &Value) -> EntityTag {
    let canonical = to_canonical_string(fields);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest: String = hasher.finalize().encode_hex();
    EntityTag(format!("\"{}\"", digest))
}

/// Tag of a list representation: the ordered tag fields of every item.
pub fn compute_list_tag<'a, V, I>(items: I) -> EntityTag
where
    V: Versioned + 'a,
    I: IntoIterator<Item = &'a V>,
{
    let fields: Vec<Value> = items.into_iter().map(Versioned::tag_fields).collect();
    compute_tag(&Value::Array(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Doc {
        title: String,
        hits: u64,
    }

    impl Versioned for Doc {
        fn tag_fields(&self) -> Value {
            json!({ "title": self.title })
        }
    }

    #[test]
    fn test_tag_is_quoted_hex() {
        let tag = compute_tag(&json!({"a": 1}));
        assert!(tag.as_str().starts_with('"') && tag.as_str().ends_with('"'));
        assert_eq!(tag.opaque().len(), 64);
        assert!(tag.opaque().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": {"p": [1, 2], "q": "s"}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": {"q": "s", "p": [1, 2]}, "x": 1}"#).unwrap();
        assert_eq!(compute_tag(&a), compute_tag(&b));
    }

    #[test]
    fn test_any_field_change_changes_tag() {
        let base = compute_tag(&json!({"x": 1, "y": [1, 2]}));
        assert_ne!(base, compute_tag(&json!({"x": 2, "y": [1, 2]})));
        assert_ne!(base, compute_tag(&json!({"x": 1, "y": [2, 1]})));
        assert_ne!(base, compute_tag(&json!({"x": 1, "y": [1, 2], "z": null})));
    }

    #[test]
    fn test_bookkeeping_fields_ignored() {
        let a = Doc { title: "t".into(), hits: 1 };
        let b = Doc { title: "t".into(), hits: 99 };
        assert_eq!(a.entity_tag(), b.entity_tag());
        assert_ne!(a.hits, b.hits);
    }

    #[test]
    fn test_list_tag_tracks_items() {
        let one = vec![Doc { title: "a".into(), hits: 0 }];
        let two = vec![
            Doc { title: "a".into(), hits: 0 },
            Doc { title: "b".into(), hits: 0 },
        ];
        assert_ne!(compute_list_tag(&one), compute_list_tag(&two));
        assert_eq!(compute_list_tag(&one), compute_list_tag(&one));
    }
}
