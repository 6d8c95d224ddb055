//! Corruption recovery policies.

use std::path::PathBuf;

/// Describes a document that failed to decode on open.
#[derive(Debug, Clone)]
pub struct CorruptDocument {
    pub path: PathBuf,
    pub reason: String,
    pub byte_len: usize,
}

/// Policy that replaces any corrupt document with `value`.
pub fn start_fresh<T>(value: T) -> impl Fn(&CorruptDocument) -> Option<T> + Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    move |doc: &CorruptDocument| {
        tracing::warn!(
            path = %doc.path.display(),
            reason = %doc.reason,
            bytes = doc.byte_len,
            "Starting fresh from corrupt document"
        );
        Some(value.clone())
    }
}

/// Policy that refuses to recover; the open fails.
pub fn refuse<T>() -> impl Fn(&CorruptDocument) -> Option<T> + Send + Sync + 'static {
    |_: &CorruptDocument| None
}
