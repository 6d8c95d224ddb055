//! Canonical JSON serialization.
//!
//! Object keys are emitted in byte order at every depth, arrays keep their
//! element order, and no insignificant whitespace is produced. Scalars use
//! `serde_json`'s own formatting so numbers and string escapes are stable.

use serde_json::Value;

/// Serialize `value` into its canonical text form.
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(out, &Value::String(key.clone()));
                out.push(':');
                write_value(out, val);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        scalar => write_scalar(out, scalar),
    }
}

fn write_scalar(out: &mut String, value: &Value) {
    // Serializing a scalar Value cannot fail.
    out.push_str(&serde_json::to_string(value).unwrap_or_default());
}
