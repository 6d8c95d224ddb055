//! Reusable plan templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::resources::fields::{self, FieldErrors, Validation};
use crate::resources::{null_as_empty, touch, CollectionResource, Resource, Stamp, Validate};
use crate::store::Identified;
use crate::versioning::Versioned;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub focus: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub content: String,
    pub focus: String,
    pub metadata: Map<String, Value>,
}

impl Versioned for Template {
    fn tag_fields(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "content": self.content,
            "focus": self.focus,
            "metadata": self.metadata,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
            "createdBy": self.created_by,
            "updatedBy": self.updated_by,
        })
    }
}

impl Identified for Template {
    fn id(&self) -> u64 {
        self.id
    }

    fn normalize(&mut self) {
        self.updated_at = touch(self.created_at, self.updated_at);
    }
}

impl Resource for Template {
    type Draft = TemplateDraft;
}

impl CollectionResource for Template {
    const KIND: &'static str = "templates";

    fn create(id: u64, draft: TemplateDraft, stamp: &Stamp) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            content: draft.content,
            focus: draft.focus,
            metadata: draft.metadata,
            created_at: stamp.at,
            updated_at: stamp.at,
            created_by: Some(stamp.actor.clone()),
            updated_by: Some(stamp.actor.clone()),
        }
    }

    fn apply(&mut self, draft: TemplateDraft, stamp: &Stamp) {
        self.name = draft.name;
        self.description = draft.description;
        self.content = draft.content;
        self.focus = draft.focus;
        self.metadata = draft.metadata;
        self.updated_at = touch(self.created_at, stamp.at);
        self.updated_by = Some(stamp.actor.clone());
    }
}

#[derive(Debug, Default)]
pub struct TemplateValidator;

impl TemplateValidator {
    fn check(&self, payload: &Value, current: Option<&Template>) -> Validation<TemplateDraft> {
        let mut errors = FieldErrors::new();
        let Some(map) = fields::object(payload, &mut errors) else {
            return Err(errors);
        };

        let name = fields::required_string(map, "name", current.map(|t| t.name.as_str()), 120, &mut errors);
        let description = fields::string(
            map,
            "description",
            Some(current.map_or("", |t| t.description.as_str())),
            &mut errors,
        );
        let content = fields::string(map, "content", Some(current.map_or("", |t| t.content.as_str())), &mut errors);
        let focus = fields::string(map, "focus", Some(current.map_or("", |t| t.focus.as_str())), &mut errors);
        let metadata = fields::object_field(map, "metadata", current.map(|t| &t.metadata), &mut errors);

        match (name, description, content, focus, metadata) {
            (Some(name), Some(description), Some(content), Some(focus), Some(metadata)) => {
                errors.finish(TemplateDraft {
                    name,
                    description,
                    content,
                    focus: focus.trim().to_string(),
                    metadata,
                })
            }
            _ => Err(errors),
        }
    }
}

impl Validate<Template> for TemplateValidator {
    fn validate_create(&self, payload: &Value) -> Validation<TemplateDraft> {
        self.check(payload, None)
    }

    fn validate_update(&self, payload: &Value, current: &Template) -> Validation<TemplateDraft> {
        self.check(payload, Some(current))
    }
}
