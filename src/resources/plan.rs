//! Training plans.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::resources::fields::{self, FieldErrors, Validation};
use crate::resources::{null_as_empty, touch, CollectionResource, Resource, Stamp, Validate};
use crate::store::Identified;
use crate::versioning::Versioned;

const MAX_TITLE_CHARS: usize = 200;
const MAX_FOCUS_CHARS: usize = 64;

/// One planned session or block on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub date: NaiveDate,
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

/// Checked client input for a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDraft {
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    pub focus: String,
    pub metadata: Map<String, Value>,
}

impl Versioned for Plan {
    fn tag_fields(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "content": self.content,
            "date": self.date,
            "focus": self.focus,
            "metadata": self.metadata,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
            "createdBy": self.created_by,
            "updatedBy": self.updated_by,
        })
    }
}

impl Identified for Plan {
    fn id(&self) -> u64 {
        self.id
    }

    fn normalize(&mut self) {
        self.updated_at = touch(self.created_at, self.updated_at);
    }
}

impl Resource for Plan {
    type Draft = PlanDraft;
}

impl CollectionResource for Plan {
    const KIND: &'static str = "plans";

    fn create(id: u64, draft: PlanDraft, stamp: &Stamp) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            date: draft.date,
            focus: draft.focus,
            metadata: draft.metadata,
            created_at: stamp.at,
            updated_at: stamp.at,
            created_by: Some(stamp.actor.clone()),
            updated_by: Some(stamp.actor.clone()),
        }
    }

    fn apply(&mut self, draft: PlanDraft, stamp: &Stamp) {
        self.title = draft.title;
        self.content = draft.content;
        self.date = draft.date;
        self.focus = draft.focus;
        self.metadata = draft.metadata;
        self.updated_at = touch(self.created_at, stamp.at);
        self.updated_by = Some(stamp.actor.clone());
    }
}

/// Field rules for plans.
#[derive(Debug, Default)]
pub struct PlanValidator;

impl PlanValidator {
    fn check(&self, payload: &Value, current: Option<&Plan>) -> Validation<PlanDraft> {
        let mut errors = FieldErrors::new();
        let Some(map) = fields::object(payload, &mut errors) else {
            return Err(errors);
        };

        let title = fields::required_string(
            map,
            "title",
            current.map(|p| p.title.as_str()),
            MAX_TITLE_CHARS,
            &mut errors,
        );
        let content = fields::string(map, "content", Some(current.map_or("", |p| p.content.as_str())), &mut errors);
        let focus = fields::string(map, "focus", Some(current.map_or("", |p| p.focus.as_str())), &mut errors)
            .map(|f| f.trim().to_string());
        if let Some(f) = &focus {
            if f.chars().count() > MAX_FOCUS_CHARS {
                errors.push("focus", format!("must be at most {} characters", MAX_FOCUS_CHARS));
            }
        }
        let metadata = fields::object_field(map, "metadata", current.map(|p| &p.metadata), &mut errors);
        let date = parse_date(map, current.map(|p| p.date), &mut errors);

        match (title, content, date, focus, metadata) {
            (Some(title), Some(content), Some(date), Some(focus), Some(metadata)) => errors.finish(PlanDraft {
                title,
                content,
                date,
                focus,
                metadata,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_date(
    map: &Map<String, Value>,
    fallback: Option<NaiveDate>,
    errors: &mut FieldErrors,
) -> Option<NaiveDate> {
    match map.get("date") {
        None | Some(Value::Null) => {
            if fallback.is_none() {
                errors.push("date", "is required");
            }
            fallback
        }
        Some(Value::String(s)) => match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push("date", "must be an ISO-8601 date (YYYY-MM-DD)");
                None
            }
        },
        Some(_) => {
            errors.push("date", "must be a string");
            None
        }
    }
}

impl Validate<Plan> for PlanValidator {
    fn validate_create(&self, payload: &Value) -> Validation<PlanDraft> {
        self.check(payload, None)
    }

    fn validate_update(&self, payload: &Value, current: &Plan) -> Validation<PlanDraft> {
        self.check(payload, Some(current))
    }
}
