//! Snippet library: reusable text blocks inserted into plan content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::resources::fields::{self, FieldErrors, Validation};
use crate::resources::{Resource, SingletonResource, Stamp, Validate};
use crate::versioning::Versioned;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetLibrary {
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Versioned for SnippetLibrary {
    fn tag_fields(&self) -> Value {
        json!({
            "snippets": self.snippets,
            "updatedAt": self.updated_at,
            "updatedBy": self.updated_by,
        })
    }
}

impl Resource for SnippetLibrary {
    type Draft = Vec<Snippet>;
}

impl SingletonResource for SnippetLibrary {
    const KIND: &'static str = "snippets";

    fn replace(&mut self, draft: Vec<Snippet>, stamp: &Stamp) {
        self.snippets = draft;
        self.updated_at = Some(stamp.at);
        self.updated_by = Some(stamp.actor.clone());
    }

    /// Every snippet gets a unique id.
    fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        for snippet in &mut self.snippets {
            if snippet.id.trim().is_empty() || !seen.insert(snippet.id.clone()) {
                snippet.id = Uuid::new_v4().to_string();
                seen.insert(snippet.id.clone());
            }
        }
        self
    }
}

#[derive(Debug, Default)]
pub struct SnippetValidator;

impl Validate<SnippetLibrary> for SnippetValidator {
    fn validate_create(&self, payload: &Value) -> Validation<Vec<Snippet>> {
        let mut errors = FieldErrors::new();
        let Some(map) = fields::object(payload, &mut errors) else {
            return Err(errors);
        };

        let snippets = fields::array(map, "snippets", &mut errors, |i, item, errors| {
            let id = fields::string(item, "id", Some(""), errors);
            let label = fields::required_string(item, "label", None, 120, errors);
            let body = fields::string(item, "body", Some(""), errors);
            let tags = match item.get("tags") {
                None | Some(Value::Null) => Some(Vec::new()),
                Some(Value::Array(tags)) if tags.iter().all(Value::is_string) => Some(
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                ),
                Some(_) => {
                    errors.push(format!("snippets[{}].tags", i), "must be an array of strings");
                    None
                }
            };
            Some(Snippet {
                id: id?.trim().to_string(),
                label: label?,
                body: body?,
                tags: tags?,
            })
        });

        match snippets {
            Some(snippets) => errors.finish(snippets),
            None => Err(errors),
        }
    }
}
