//! Display text for values
//!
//! [`stringify`] never fails. It runs inside error reporting, so a value
//! that cannot be rendered turns into the text `invalid` instead.

use crate::value::Value;

/// Text used for values that cannot be rendered
pub const INVALID: &str = "invalid";

/// Thunks returning thunks are followed this many times
const MAX_THUNK_DEPTH: usize = 16;

/// Convert any value to display text
///
/// Strings are returned as-is, thunks are invoked and their result
/// rendered, booleans, integers and null get their literal text, objects
/// may provide their own text. Everything else is compact JSON with
/// slashes and non-ASCII characters left unescaped.
///
/// ```
/// use savoksi_core::{stringify, Value};
///
/// assert_eq!(stringify(&Value::from("äiti")), "äiti");
/// assert_eq!(stringify(&Value::from(vec!["a/b"])), r#"["a/b"]"#);
/// ```
pub fn stringify(value: &Value) -> String {
    render(value, 0)
}

fn render(value: &Value, depth: usize) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Thunk(thunk) => {
            if depth >= MAX_THUNK_DEPTH {
                log::trace!("Thunk chain deeper than {}, giving up", MAX_THUNK_DEPTH);
                return INVALID.to_string();
            }
            render(&thunk.call(), depth + 1)
        }
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(object) => object.text().unwrap_or_else(|| json(value)),
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => INVALID.to_string(),
        },
        Value::Float(_) | Value::Sequence(_) | Value::Mapping(_) => json(value),
    }
}

fn json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| INVALID.to_string())
}
