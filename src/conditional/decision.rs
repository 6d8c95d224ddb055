use crate::conditional::precondition::Precondition;
use crate::versioning::EntityTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    /// 304 with the current tag and no body.
    NotModified,
    /// 412 with the current resource and tag.
    PreconditionFailed,
    /// 428; the write carried no `If-Match`.
    PreconditionRequired,
}

pub fn evaluate_read(if_none_match: Option<&Precondition>, current: &EntityTag) -> Decision {
    match if_none_match {
        Some(p) if p.matches(current) => Decision::NotModified,
        _ => Decision::Proceed,
    }
}

pub fn evaluate_write(if_match: Option<&Precondition>, current: &EntityTag) -> Decision {
    match if_match {
        None => Decision::PreconditionRequired,
        Some(p) if p.matches(current) => Decision::Proceed,
        Some(_) => Decision::PreconditionFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag() -> EntityTag {
        EntityTag::from_quoted("\"abc\"")
    }

    #[test]
    fn test_read() {
        assert_eq!(evaluate_read(None, &tag()), Decision::Proceed);
        let same = Precondition::parse("\"abc\"").unwrap();
        assert_eq!(evaluate_read(Some(&same), &tag()), Decision::NotModified);
        let other = Precondition::parse("\"zzz\"").unwrap();
        assert_eq!(evaluate_read(Some(&other), &tag()), Decision::Proceed);
    }

    #[test]
    fn test_write() {
        assert_eq!(evaluate_write(None, &tag()), Decision::PreconditionRequired);
        assert_eq!(evaluate_write(Some(&Precondition::Any), &tag()), Decision::Proceed);
        let stale = Precondition::parse("\"old\"").unwrap();
        assert_eq!(evaluate_write(Some(&stale), &tag()), Decision::PreconditionFailed);
    }
}
