//! Field-level validation helpers shared by the resource validators.

use serde::Serialize;
use serde_json::{Map, Value};

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// Every problem found in a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

/// Result of a validation collaborator.
pub type Validation<D> = Result<D, FieldErrors>;

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(value)` if nothing was recorded.
    pub fn finish<D>(self, value: D) -> Validation<D> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// The payload as an object, or a single `body` error.
pub fn object<'a>(payload: &'a Value, errors: &mut FieldErrors) -> Option<&'a Map<String, Value>> {
    match payload.as_object() {
        Some(map) => Some(map),
        None => {
            errors.push("body", "must be a JSON object");
            None
        }
    }
}

/// A string field. Missing or `null` yields `fallback`.
pub fn string(
    map: &Map<String, Value>,
    field: &str,
    fallback: Option<&str>,
    errors: &mut FieldErrors,
) -> Option<String> {
    match map.get(field) {
        None | Some(Value::Null) => fallback.map(str::to_string),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

/// A non-blank string of at most `max_chars`; the result is trimmed.
pub fn required_string(
    map: &Map<String, Value>,
    field: &str,
    fallback: Option<&str>,
    max_chars: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let present = matches!(map.get(field), Some(v) if !v.is_null());
    let Some(value) = string(map, field, fallback, errors) else {
        if !present {
            errors.push(field, "is required");
        }
        return None;
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
        return None;
    }
    if trimmed.chars().count() > max_chars {
        errors.push(field, format!("must be at most {} characters", max_chars));
        return None;
    }
    Some(trimmed.to_string())
}

/// An object field; `null` means empty.
pub fn object_field(
    map: &Map<String, Value>,
    field: &str,
    fallback: Option<&Map<String, Value>>,
    errors: &mut FieldErrors,
) -> Option<Map<String, Value>> {
    match map.get(field) {
        None => Some(fallback.cloned().unwrap_or_default()),
        Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(obj)) => Some(obj.clone()),
        Some(_) => {
            errors.push(field, "must be an object");
            None
        }
    }
}

/// An array field, each element checked by `item`.
pub fn array<T, F>(
    map: &Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
    mut item: F,
) -> Option<Vec<T>>
where
    F: FnMut(usize, &Map<String, Value>, &mut FieldErrors) -> Option<T>,
{
    let items = match map.get(field) {
        None | Some(Value::Null) => return Some(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(field, "must be an array");
            return None;
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, value) in items.iter().enumerate() {
        match value.as_object() {
            Some(obj) => {
                if let Some(v) = item(i, obj, errors) {
                    out.push(v);
                }
            }
            None => errors.push(format!("{}[{}]", field, i), "must be an object"),
        }
    }
    Some(out)
}
