//! Highlight configuration: patterns the calendar view colors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::resources::fields::{self, FieldErrors, Validation};
use crate::resources::{Resource, SingletonResource, Stamp, Validate};
use crate::versioning::Versioned;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub pattern: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightConfig {
    #[serde(default)]
    pub highlights: Vec<HighlightRule>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Versioned for HighlightConfig {
    fn tag_fields(&self) -> Value {
        json!({
            "highlights": self.highlights,
            "updatedAt": self.updated_at,
            "updatedBy": self.updated_by,
        })
    }
}

impl Resource for HighlightConfig {
    type Draft = Vec<HighlightRule>;
}

impl SingletonResource for HighlightConfig {
    const KIND: &'static str = "highlights";

    fn replace(&mut self, draft: Vec<HighlightRule>, stamp: &Stamp) {
        self.highlights = draft;
        self.updated_at = Some(stamp.at);
        self.updated_by = Some(stamp.actor.clone());
    }
}

/// `#rgb` or `#rrggbb`.
fn is_hex_color(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Default)]
pub struct HighlightValidator;

impl Validate<HighlightConfig> for HighlightValidator {
    fn validate_create(&self, payload: &Value) -> Validation<Vec<HighlightRule>> {
        let mut errors = FieldErrors::new();
        let Some(map) = fields::object(payload, &mut errors) else {
            return Err(errors);
        };

        let rules = fields::array(map, "highlights", &mut errors, |i, item, errors| {
            let pattern = fields::required_string(item, "pattern", None, 200, errors);
            let color = fields::required_string(item, "color", None, 7, errors);
            let label = fields::string(item, "label", None, errors);
            match (pattern, color) {
                (Some(pattern), Some(color)) if is_hex_color(&color) => Some(HighlightRule {
                    pattern,
                    color: color.to_ascii_lowercase(),
                    label,
                }),
                (Some(_), Some(_)) => {
                    errors.push(format!("highlights[{}].color", i), "must be #rgb or #rrggbb");
                    None
                }
                _ => None,
            }
        });

        match rules {
            Some(rules) => errors.finish(rules),
            None => Err(errors),
        }
    }
}
