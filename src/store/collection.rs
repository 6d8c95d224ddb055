//! List-shaped documents: `{ "nextId": n, "items": [...] }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::versioning::{tag::compute_list_tag, EntityTag, Versioned};

/// Items stored in a [`Collection`].
pub trait Identified {
    fn id(&self) -> u64;

    /// Repair item-level invariants after load or mutation.
    fn normalize(&mut self) {}
}

/// A collection document with a monotonically increasing id counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    #[serde(default = "first_id")]
    pub next_id: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

fn first_id() -> u64 {
    1
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            items: Vec::new(),
        }
    }
}

/// A list representation is versioned by its items, in order; `nextId` is
/// bookkeeping and does not affect the tag.
impl<T: Versioned> Versioned for Collection<T> {
    fn tag_fields(&self) -> Value {
        Value::Array(self.items.iter().map(Versioned::tag_fields).collect())
    }

    fn entity_tag(&self) -> EntityTag {
        compute_list_tag(&self.items)
    }
}

impl<T: Identified> Collection<T> {
    /// Append an item built from the next id and advance the counter.
    pub fn insert_with<F>(&mut self, build: F) -> &T
    where
        F: FnOnce(u64) -> T,
    {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.items.push(build(id));
        &self.items[self.items.len() - 1]
    }

    pub fn find(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ensure `next_id` is ahead of every stored id and normalize each item.
    pub fn normalized(mut self) -> Self {
        let max_id = self.items.iter().map(Identified::id).max().unwrap_or(0);
        if self.next_id <= max_id {
            self.next_id = max_id + 1;
        }
        if self.next_id == 0 {
            self.next_id = 1;
        }
        for item in &mut self.items {
            item.normalize();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u64,
        name: String,
    }

    impl Identified for Item {
        fn id(&self) -> u64 {
            self.id
        }

        fn normalize(&mut self) {
            self.name = self.name.trim().to_string();
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut c: Collection<Item> = Collection::default();
        for name in ["a", "b", "c"] {
            c.insert_with(|id| Item { id, name: name.into() });
        }
        let ids: Vec<u64> = c.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(c.next_id, 4);
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut c: Collection<Item> = Collection::default();
        c.insert_with(|id| Item { id, name: "a".into() });
        c.insert_with(|id| Item { id, name: "b".into() });
        assert!(c.remove(2).is_some());
        let id = c.insert_with(|id| Item { id, name: "c".into() }).id;
        assert_eq!(id, 3);
        assert!(c.find(2).is_none());
    }

    #[test]
    fn test_normalize_repairs_counter() {
        let c = Collection {
            next_id: 2,
            items: vec![
                Item { id: 7, name: " x ".into() },
                Item { id: 3, name: "y".into() },
            ],
        }
        .normalized();
        assert_eq!(c.next_id, 8);
        assert_eq!(c.items[0].name, "x");
    }

    #[test]
    fn test_wire_shape() {
        let mut c: Collection<Item> = Collection::default();
        c.insert_with(|id| Item { id, name: "a".into() });
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["nextId"], 2);
        assert_eq!(json["items"][0]["id"], 1);

        let empty: Collection<Item> = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.next_id, 1);
        assert!(empty.is_empty());
    }

    impl Versioned for Item {
        fn tag_fields(&self) -> Value {
            serde_json::json!({ "id": self.id, "name": self.name })
        }
    }

    #[test]
    fn test_list_tag_ignores_counter() {
        let mut a: Collection<Item> = Collection::default();
        a.insert_with(|id| Item { id, name: "x".into() });
        let mut b = a.clone();
        b.next_id = 50;
        assert_eq!(a.entity_tag(), b.entity_tag());

        b.items[0].name = "y".into();
        assert_ne!(a.entity_tag(), b.entity_tag());
    }
}
