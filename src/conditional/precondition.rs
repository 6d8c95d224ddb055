use axum::http::{header, HeaderMap, HeaderName};

use crate::versioning::EntityTag;

/// A parsed `If-Match` / `If-None-Match` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// `*`
    Any,
    Tags(Vec<String>),
}

impl Precondition {
    /// `None` if the value is empty or only separators.
    pub fn parse(value: &str) -> Option<Self> {
        let entries = split_list(value);
        if entries.is_empty() {
            return None;
        }
        if entries.iter().any(|e| e == "*") {
            return Some(Precondition::Any);
        }
        Some(Precondition::Tags(entries))
    }

    pub fn matches(&self, current: &EntityTag) -> bool {
        match self {
            Precondition::Any => true,
            Precondition::Tags(tags) => {
                let current = strip_weak(current.as_str());
                tags.iter().any(|tag| strip_weak(tag) == current)
            }
        }
    }
}

pub fn if_match(headers: &HeaderMap) -> Option<Precondition> {
    from_header(headers, header::IF_MATCH)
}

pub fn if_none_match(headers: &HeaderMap) -> Option<Precondition> {
    from_header(headers, header::IF_NONE_MATCH)
}

/// Repeated header lines are one list.
fn from_header(headers: &HeaderMap, name: HeaderName) -> Option<Precondition> {
    let joined = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    Precondition::parse(&joined)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Split on commas that are not inside a quoted tag.
fn split_list(value: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => {
                push_entry(&mut entries, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_entry(&mut entries, &current);
    entries
}

fn push_entry(entries: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        entries.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn tag(hex: &str) -> EntityTag {
        EntityTag::from_quoted(format!("\"{}\"", hex))
    }

    #[test]
    fn test_empty_is_absent() {
        assert_eq!(Precondition::parse(""), None);
        assert_eq!(Precondition::parse("  , ,"), None);
    }

    #[test]
    fn test_wildcard() {
        assert_eq!(Precondition::parse("*"), Some(Precondition::Any));
        assert!(Precondition::Any.matches(&tag("abc")));
    }

    #[test]
    fn test_list_and_weak_prefix() {
        let p = Precondition::parse("\"one\", W/\"abc\"").unwrap();
        assert!(p.matches(&tag("abc")));
        assert!(!p.matches(&tag("two")));
    }

    #[test]
    fn test_comma_inside_quotes_is_not_a_separator() {
        let p = Precondition::parse("\"a,b\", \"c\"").unwrap();
        assert_eq!(p, Precondition::Tags(vec!["\"a,b\"".into(), "\"c\"".into()]));
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append(header::IF_MATCH, HeaderValue::from_static("\"one\""));
        headers.append(header::IF_MATCH, HeaderValue::from_static("\"two\""));

        assert!(if_match(&headers).unwrap().matches(&tag("two")));
        assert!(if_none_match(&headers).is_none());
    }
}
